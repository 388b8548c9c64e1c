use serde::{Deserialize, Serialize};

use crate::api::CatalogError;
use crate::state::{CatalogItem, CatalogItemDetail};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[action(infer_categories)]
pub enum Action {
    Init,

    /// Request the next page; ignored while one is in flight.
    ListLoadNext,
    ListDidLoad(Vec<CatalogItem>),
    ListDidError(CatalogError),

    SelectionMove(i16),
    SelectionPage(i16),
    SelectionJumpTop,
    SelectionJumpBottom,

    DetailOpen(u32),
    DetailOpenSelected,
    DetailClose,
    DetailDidLoad(CatalogItemDetail),
    DetailDidError { id: u32, error: CatalogError },

    MessageDismiss,

    UiTerminalResize(u16, u16),
    Tick,
    Quit,
}
