//! Admin users list: search parsing, paging, the fetch cache and the TUI view.

mod debounce;
mod fade;
pub mod fetcher;
pub mod filters;
pub mod pagination;
pub mod query;
pub mod render;
pub mod selection;
#[cfg(test)]
mod testing;
mod tui;
pub mod view;

pub use debounce::Debouncer;
pub use fade::Fade;
pub use fetcher::{FetchConfig, FetchResponse, UserListFetcher, UserSource};
pub use filters::{FilterField, FilterValue, parse_filters};
pub use pagination::PageDescriptor;
pub use query::{QueryParams, Sort};
pub use tui::run_users_tui;
pub use view::{UserListView, ViewAction};
