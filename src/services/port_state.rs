// src/services/port_state.rs

//! Máquina de estados das portas de CTO.
//!
//! Livre -> Reservada -> (liberar) -> Livre
//! Livre -> Ocupada (somente por atribuição de cliente) -> Livre
//! qualquer -> Defeito -> (reparo) -> Livre

use serde_json::json;

use crate::{common::error::AppError, models::enclosure::PortStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortEvent {
    Reserve,
    Release,
    Assign,
    Unassign,
    MarkFaulty,
    Repair,
}

impl PortEvent {
    fn code(self) -> &'static str {
        match self {
            PortEvent::Reserve => "reservar",
            PortEvent::Release => "liberar",
            PortEvent::Assign => "atribuir",
            PortEvent::Unassign => "desatribuir",
            PortEvent::MarkFaulty => "marcarDefeito",
            PortEvent::Repair => "reparar",
        }
    }

    /// Verbo que precede "uma porta" na mensagem de erro.
    fn phrase(self) -> &'static str {
        match self {
            PortEvent::Reserve => "reservar",
            PortEvent::Release => "liberar",
            PortEvent::Assign => "atribuir cliente a",
            PortEvent::Unassign => "desatribuir o cliente de",
            PortEvent::MarkFaulty => "marcar defeito em",
            PortEvent::Repair => "reparar",
        }
    }
}

fn label(status: PortStatus) -> &'static str {
    match status {
        PortStatus::Free => "Livre",
        PortStatus::Reserved => "Reservada",
        PortStatus::InUse => "Ocupada",
        PortStatus::Faulty => "Defeito",
    }
}

/// Aplica o evento ao status atual. Transições fora da tabela são 400.
pub fn transition(from: PortStatus, event: PortEvent) -> Result<PortStatus, AppError> {
    use PortEvent::*;
    use PortStatus::*;

    let to = match (from, event) {
        (Free, Reserve) => Some(Reserved),
        (Reserved, Release) => Some(Free),
        (Free, Assign) => Some(InUse),
        (InUse, Unassign) => Some(Free),
        (Free | Reserved | InUse, MarkFaulty) => Some(Faulty),
        (Faulty, Repair) => Some(Free),
        _ => None,
    };

    to.ok_or_else(|| {
        AppError::invariant(
            format!(
                "Não é possível {} uma porta com status {}.",
                event.phrase(),
                label(from)
            ),
            json!({ "statusAtual": from, "operacao": event.code() }),
        )
    })
}

/// Traduz um pedido manual de status (PATCH da porta) para o evento.
/// `Ocupada` nunca é aceita manualmente: só uma atribuição de cliente ocupa.
pub fn manual_event(from: PortStatus, requested: PortStatus) -> Result<Option<PortEvent>, AppError> {
    use PortStatus::*;

    if from == requested {
        return Ok(None);
    }

    let event = match (from, requested) {
        (_, InUse) => {
            return Err(AppError::invariant(
                "Uma porta só fica Ocupada ao ser atribuída a um cliente.",
                json!({ "statusAtual": from, "statusSolicitado": requested }),
            ));
        }
        (_, Reserved) => PortEvent::Reserve,
        (_, Faulty) => PortEvent::MarkFaulty,
        (Reserved, Free) => PortEvent::Release,
        (Faulty, Free) => PortEvent::Repair,
        (InUse, Free) => {
            return Err(AppError::invariant(
                "Para liberar uma porta ocupada, remova ou troque a porta do cliente.",
                json!({ "statusAtual": from, "statusSolicitado": requested }),
            ));
        }
        (Free, Free) => return Ok(None),
    };

    transition(from, event).map(|_| Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use PortStatus::*;

    #[test]
    fn reservation_cycle() {
        assert_eq!(transition(Free, PortEvent::Reserve).unwrap(), Reserved);
        assert_eq!(transition(Reserved, PortEvent::Release).unwrap(), Free);
    }

    #[test]
    fn assignment_requires_a_free_port() {
        assert_eq!(transition(Free, PortEvent::Assign).unwrap(), InUse);
        assert!(transition(Reserved, PortEvent::Assign).is_err());
        assert!(transition(InUse, PortEvent::Assign).is_err());
        assert!(transition(Faulty, PortEvent::Assign).is_err());
    }

    #[test]
    fn any_state_can_become_faulty_and_repair_frees_it() {
        for from in [Free, Reserved, InUse] {
            assert_eq!(transition(from, PortEvent::MarkFaulty).unwrap(), Faulty);
        }
        assert!(transition(Faulty, PortEvent::MarkFaulty).is_err());
        assert_eq!(transition(Faulty, PortEvent::Repair).unwrap(), Free);
    }

    #[test]
    fn rejection_message_reads_naturally() {
        let err = transition(Reserved, PortEvent::Assign).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Não é possível atribuir cliente a uma porta com status Reservada."
        );
    }

    #[test]
    fn occupied_is_never_set_manually() {
        for from in [Free, Reserved, Faulty] {
            assert!(manual_event(from, InUse).is_err());
        }
        assert!(manual_event(InUse, Free).is_err());
    }

    #[test]
    fn manual_requests_map_to_events() {
        assert_eq!(manual_event(Free, Reserved).unwrap(), Some(PortEvent::Reserve));
        assert_eq!(manual_event(Reserved, Free).unwrap(), Some(PortEvent::Release));
        assert_eq!(manual_event(Faulty, Free).unwrap(), Some(PortEvent::Repair));
        assert_eq!(manual_event(InUse, Faulty).unwrap(), Some(PortEvent::MarkFaulty));
        assert_eq!(manual_event(Free, Free).unwrap(), None);
        assert!(manual_event(Reserved, Reserved).unwrap().is_none());
        assert!(manual_event(Faulty, Reserved).is_err());
    }
}
