use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::effect::Effect;
use crate::state::{AppState, CatalogItem, PAGE_SIZE};

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => {
            // A restored snapshot may carry flags for fetches that no longer exist.
            state.list_loading = false;
            state.detail_pending = None;
            state.detail_loading = false;
            state.clear_message();
            load_next_page(state)
        }

        Action::ListLoadNext => load_next_page(state),

        Action::ListDidLoad(items) => {
            if !state.list_loading {
                return DispatchResult::unchanged();
            }
            tracing::debug!(
                page = state.current_page,
                received = items.len(),
                "page loaded"
            );
            state.has_more = !items.is_empty();
            state.items.extend(items);
            state.current_page += 1;
            state.last_error = None;
            state.list_loading = false;
            DispatchResult::changed()
        }

        Action::ListDidError(error) => {
            if !state.list_loading {
                return DispatchResult::unchanged();
            }
            tracing::warn!(page = state.current_page, %error, "page load failed");
            state.show_message(format!("Could not load pokemon: {error}"));
            state.last_error = Some(error);
            state.list_loading = false;
            DispatchResult::changed()
        }

        Action::SelectionMove(delta) => {
            let target = state.selected_index as i64 + i64::from(delta);
            select(state, target.max(0) as usize)
        }

        Action::SelectionPage(step) => {
            let rows = list_page_rows(state) as i64;
            let target = state.selected_index as i64 + i64::from(step) * rows;
            select(state, target.max(0) as usize)
        }

        Action::SelectionJumpTop => select(state, 0),

        Action::SelectionJumpBottom => select(state, state.items.len().saturating_sub(1)),

        Action::DetailOpen(id) => open_detail(state, id),

        Action::DetailOpenSelected => match state.selected_item().and_then(CatalogItem::id) {
            Some(id) => open_detail(state, id),
            None => DispatchResult::unchanged(),
        },

        Action::DetailClose => {
            if !state.detail_open {
                return DispatchResult::unchanged();
            }
            state.detail_open = false;
            state.detail_failed = None;
            state.detail_pending = None;
            state.detail_loading = false;
            DispatchResult::changed()
        }

        Action::DetailDidLoad(detail) => {
            if state.detail_pending != Some(detail.id) {
                return DispatchResult::unchanged();
            }
            state.detail = Some(detail);
            state.detail_failed = None;
            state.detail_pending = None;
            state.detail_loading = false;
            DispatchResult::changed()
        }

        Action::DetailDidError { id, error } => {
            if state.detail_pending != Some(id) {
                return DispatchResult::unchanged();
            }
            tracing::warn!(id, %error, "detail load failed");
            state.detail_pending = None;
            state.detail_loading = false;
            state.detail_failed = Some(id);
            state.show_message(format!("Could not load #{id}: {error}"));
            DispatchResult::changed()
        }

        Action::MessageDismiss => {
            if state.clear_message() {
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }

        Action::UiTerminalResize(width, height) => {
            if state.terminal_size != (width, height) {
                state.terminal_size = (width, height);
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }

        Action::Tick => tick(state),

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn load_next_page(state: &mut AppState) -> DispatchResult<Effect> {
    match start_page_load(state) {
        Some(effect) => DispatchResult::changed_with(effect),
        None => DispatchResult::unchanged(),
    }
}

fn start_page_load(state: &mut AppState) -> Option<Effect> {
    if state.list_loading {
        return None;
    }
    state.list_loading = true;
    Some(Effect::FetchPage {
        offset: state.next_offset(),
        limit: PAGE_SIZE,
    })
}

fn select(state: &mut AppState, index: usize) -> DispatchResult<Effect> {
    let moved = state.set_selected_index(index);
    match end_of_list_trigger(state) {
        Some(effect) => DispatchResult::changed_with(effect),
        None if moved => DispatchResult::changed(),
        None => DispatchResult::unchanged(),
    }
}

/// Fires once per arrival at the last item; re-arms when the selection leaves
/// the end or the list grows.
fn end_of_list_trigger(state: &mut AppState) -> Option<Effect> {
    if !state.at_list_end() {
        state.end_trigger = None;
        return None;
    }
    let len = state.items.len();
    if state.end_trigger == Some(len) || state.list_loading || !state.has_more {
        return None;
    }
    state.end_trigger = Some(len);
    start_page_load(state)
}

fn open_detail(state: &mut AppState, id: u32) -> DispatchResult<Effect> {
    state.detail_open = true;
    state.detail_failed = None;
    if state.detail.as_ref().is_some_and(|detail| detail.id == id) {
        state.detail_pending = None;
        state.detail_loading = false;
        return DispatchResult::changed();
    }
    if state.detail_pending == Some(id) {
        return DispatchResult::changed();
    }
    state.detail_pending = Some(id);
    state.detail_loading = true;
    DispatchResult::changed_with(Effect::FetchDetail { id })
}

fn tick(state: &mut AppState) -> DispatchResult<Effect> {
    state.tick = state.tick.wrapping_add(1);
    if state.message_ticks > 0 {
        state.message_ticks -= 1;
        if state.message_ticks == 0 {
            state.message = None;
            return DispatchResult::changed();
        }
    }
    if state.list_loading || state.detail_loading {
        DispatchResult::changed()
    } else {
        DispatchResult::unchanged()
    }
}

fn list_page_rows(state: &AppState) -> usize {
    // Header, footer and list borders.
    usize::from(state.terminal_size.1).saturating_sub(6).max(1)
}
