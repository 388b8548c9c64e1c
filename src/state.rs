use serde::{Deserialize, Serialize};
use tui_dispatch_debug::debug::{DebugSection, DebugState, ron_string};

use crate::api::CatalogError;

pub const PAGE_SIZE: usize = 20;
pub const SPRITE_BASE: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// Ticks a notification stays on screen before it expires on its own.
pub const MESSAGE_TICKS: u32 = 40;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub url: String,
}

impl CatalogItem {
    pub fn id(&self) -> Option<u32> {
        resource_id(&self.url)
    }

    pub fn sprite_url(&self) -> Option<String> {
        self.id().map(sprite_url)
    }
}

/// Parses the numeric id from the final non-empty path segment of a resource URL.
pub fn resource_id(url: &str) -> Option<u32> {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()?
        .parse()
        .ok()
}

pub fn sprite_url(id: u32) -> String {
    format!("{SPRITE_BASE}/{id}.png")
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteUrls {
    pub front: Option<String>,
    pub front_shiny: Option<String>,
    pub back: Option<String>,
    pub back_shiny: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub name: String,
    pub url: String,
    pub is_hidden: bool,
    pub slot: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatValue {
    pub name: String,
    pub base_value: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItemDetail {
    pub id: u32,
    pub name: String,
    pub weight: u32,
    pub height: u32,
    pub sprites: SpriteUrls,
    pub abilities: Vec<AbilitySlot>,
    pub stats: Vec<StatValue>,
}

impl CatalogItemDetail {
    pub fn sprite_url(&self) -> String {
        sprite_url(self.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListPhase {
    Idle,
    Loading,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppState {
    pub terminal_size: (u16, u16),

    // List loading
    pub items: Vec<CatalogItem>,
    pub current_page: usize,
    pub list_loading: bool,
    pub has_more: bool,
    pub last_error: Option<CatalogError>,
    pub selected_index: usize,
    /// Item count at which the end-of-list trigger last fired.
    pub end_trigger: Option<usize>,

    // Detail view
    pub detail_open: bool,
    pub detail: Option<CatalogItemDetail>,
    pub detail_pending: Option<u32>,
    pub detail_loading: bool,
    /// Id whose last fetch failed; `detail` still holds the previous entry.
    pub detail_failed: Option<u32>,

    pub message: Option<String>,
    pub message_ticks: u32,
    pub tick: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            terminal_size: (80, 24),
            items: Vec::new(),
            current_page: 0,
            list_loading: false,
            has_more: true,
            last_error: None,
            selected_index: 0,
            end_trigger: None,
            detail_open: false,
            detail: None,
            detail_pending: None,
            detail_loading: false,
            detail_failed: None,
            message: None,
            message_ticks: 0,
            tick: 0,
        }
    }
}

impl AppState {
    pub fn phase(&self) -> ListPhase {
        if self.list_loading {
            ListPhase::Loading
        } else if self.last_error.is_some() {
            ListPhase::Error
        } else {
            ListPhase::Idle
        }
    }

    pub fn next_offset(&self) -> usize {
        self.current_page * PAGE_SIZE
    }

    pub fn selected_item(&self) -> Option<&CatalogItem> {
        self.items.get(self.selected_index)
    }

    pub fn at_list_end(&self) -> bool {
        !self.items.is_empty() && self.selected_index + 1 >= self.items.len()
    }

    pub fn set_selected_index(&mut self, index: usize) -> bool {
        if self.items.is_empty() {
            self.selected_index = 0;
            return false;
        }
        let bounded = index.min(self.items.len() - 1);
        if bounded != self.selected_index {
            self.selected_index = bounded;
            return true;
        }
        false
    }

    pub fn current_detail(&self) -> Option<&CatalogItemDetail> {
        if !self.detail_open || self.detail_failed.is_some() {
            return None;
        }
        self.detail.as_ref()
    }

    pub fn show_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.message_ticks = MESSAGE_TICKS;
    }

    pub fn clear_message(&mut self) -> bool {
        self.message_ticks = 0;
        self.message.take().is_some()
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        vec![
            DebugSection::new("List")
                .entry("items", ron_string(&self.items.len()))
                .entry("page", ron_string(&self.current_page))
                .entry("phase", ron_string(&self.phase()))
                .entry("has_more", ron_string(&self.has_more))
                .entry("selected", ron_string(&self.selected_index))
                .entry("end_trigger", ron_string(&self.end_trigger))
                .entry(
                    "last_error",
                    ron_string(&self.last_error.as_ref().map(|error| error.to_string())),
                ),
            DebugSection::new("Detail")
                .entry("open", ron_string(&self.detail_open))
                .entry("loaded", ron_string(&self.detail.as_ref().map(|detail| detail.id)))
                .entry("pending", ron_string(&self.detail_pending))
                .entry("loading", ron_string(&self.detail_loading))
                .entry("failed", ron_string(&self.detail_failed)),
            DebugSection::new("Status").entry("message", ron_string(&self.message)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(name: &str, url: &str) -> CatalogItem {
        CatalogItem {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_resource_id_from_trailing_slash_url() {
        let pikachu = item("pikachu", "https://pokeapi.co/api/v2/pokemon/25/");
        assert_eq!(pikachu.id(), Some(25));
        assert_eq!(
            pikachu.sprite_url().as_deref(),
            Some("https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/25.png")
        );
    }

    #[test]
    fn test_resource_id_without_trailing_slash() {
        assert_eq!(resource_id("https://pokeapi.co/api/v2/pokemon/151"), Some(151));
        assert_eq!(resource_id("/pokemon/7/?x=1"), Some(7));
    }

    #[test]
    fn test_resource_id_rejects_non_numeric_segment() {
        assert_eq!(resource_id("https://pokeapi.co/api/v2/pokemon/pikachu/"), None);
        assert_eq!(resource_id(""), None);
    }

    #[test]
    fn test_at_list_end_tracks_last_index() {
        let mut state = AppState::default();
        assert!(!state.at_list_end());

        state.items = vec![item("a", "/1/"), item("b", "/2/")];
        assert!(!state.at_list_end());
        state.set_selected_index(5);
        assert_eq!(state.selected_index, 1);
        assert!(state.at_list_end());
    }

    #[test]
    fn test_phase_reflects_flags() {
        let mut state = AppState::default();
        assert_eq!(state.phase(), ListPhase::Idle);
        state.list_loading = true;
        assert_eq!(state.phase(), ListPhase::Loading);
        state.list_loading = false;
        state.last_error = Some(CatalogError::Http { status: 500 });
        assert_eq!(state.phase(), ListPhase::Error);
    }
}
