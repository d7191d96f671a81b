//! URL query strings to store queries: filtering, projection, sorting,
//! pagination and relation expansion for listing endpoints.

pub mod page;
pub mod params;
pub mod spec;

pub use page::{build_page, PageLink, PageResult, Pagination};
pub use params::{parse_params, rewrite_operators, CONTROL_KEYS};
pub use spec::{Projection, QuerySpec};
