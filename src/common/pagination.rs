// src/common/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Parâmetros `pagina` / `limite` que toda listagem aceita.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub pagina: Option<i64>,
    pub limite: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.pagina.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limite.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// Satura em vez de estourar: uma página absurda só devolve lista vazia.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn describe(&self, total: i64) -> Paginacao {
        let limite = self.limit();
        Paginacao {
            total,
            pagina: self.page(),
            limite,
            total_paginas: total.saturating_add(limite - 1) / limite,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginacao {
    pub total: i64,
    pub pagina: i64,
    pub limite: i64,
    pub total_paginas: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 20);
        assert_eq!(params.offset(), 0);

        let params = PageParams { pagina: Some(0), limite: Some(1000) };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 100);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PageParams { pagina: Some(3), limite: Some(10) };
        let p = params.describe(21);
        assert_eq!(p.total_paginas, 3);
        assert_eq!(params.offset(), 20);
        assert_eq!(params.describe(0).total_paginas, 0);
    }

    #[test]
    fn huge_page_saturates_the_offset() {
        let params = PageParams { pagina: Some(i64::MAX), limite: Some(20) };
        assert_eq!(params.page(), i64::MAX);
        assert_eq!(params.offset(), i64::MAX);

        let params = PageParams { pagina: Some(i64::MAX), limite: Some(1) };
        assert_eq!(params.offset(), i64::MAX - 1);
    }
}
