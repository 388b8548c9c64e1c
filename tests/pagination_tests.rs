//! Paging flow tests: reducer + Loader against a scripted catalog.
//!
//! Effects returned by the store are run through `Loader::run` and the
//! resulting action is dispatched back, the same loop the app runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tui_dispatch::EffectStore;

use pokedex::action::Action;
use pokedex::api::{CatalogClient, CatalogError};
use pokedex::effect::Effect;
use pokedex::loader::Loader;
use pokedex::reducer::reducer;
use pokedex::state::{
    AppState, CatalogItem, CatalogItemDetail, ListPhase, SpriteUrls, StatValue, PAGE_SIZE,
};

#[derive(Default)]
struct FakeCatalog {
    pages: Mutex<VecDeque<Result<Vec<CatalogItem>, CatalogError>>>,
    requests: Mutex<Vec<(usize, usize)>>,
    detail_calls: AtomicUsize,
}

impl FakeCatalog {
    fn with_pages(pages: Vec<Result<Vec<CatalogItem>, CatalogError>>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages.into()),
            ..Self::default()
        })
    }

    fn requests(&self) -> Vec<(usize, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn fetch_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.requests.lock().unwrap().push((offset, limit));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_detail(&self, id: u32) -> Result<CatalogItemDetail, CatalogError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if id == 25 {
            Ok(pikachu())
        } else {
            Err(CatalogError::NotFound { id })
        }
    }
}

fn page(start: u32, count: u32) -> Vec<CatalogItem> {
    (start..start + count)
        .map(|id| CatalogItem {
            name: format!("mon-{id}"),
            url: format!("https://pokeapi.co/api/v2/pokemon/{id}/"),
        })
        .collect()
}

fn pikachu() -> CatalogItemDetail {
    CatalogItemDetail {
        id: 25,
        name: "pikachu".into(),
        weight: 60,
        height: 4,
        sprites: SpriteUrls {
            front: Some("https://img/25.png".into()),
            ..SpriteUrls::default()
        },
        abilities: Vec::new(),
        stats: vec![StatValue {
            name: "speed".into(),
            base_value: 90,
        }],
    }
}

type Store = EffectStore<AppState, Action, Effect>;

fn new_store() -> Store {
    EffectStore::new(AppState::default(), reducer)
}

/// Dispatches `action`, then runs every effect to completion and feeds the
/// result back into the store.
async fn drive(store: &mut Store, loader: &Loader, action: Action) {
    let mut pending = VecDeque::from([action]);
    while let Some(action) = pending.pop_front() {
        let result = store.dispatch(action);
        for effect in result.effects {
            pending.push_back(loader.run(effect).await);
        }
    }
}

#[tokio::test]
async fn test_pages_concatenate_in_order() {
    let catalog = FakeCatalog::with_pages(vec![Ok(page(1, 20)), Ok(page(21, 20)), Ok(page(41, 3))]);
    let loader = Loader::new(catalog.clone());
    let mut store = new_store();

    for _ in 0..3 {
        drive(&mut store, &loader, Action::ListLoadNext).await;
    }

    let names: Vec<String> = store.state().items.iter().map(|i| i.name.clone()).collect();
    let expected: Vec<String> = (1..44).map(|id| format!("mon-{id}")).collect();
    assert_eq!(names, expected);
    assert_eq!(
        catalog.requests(),
        vec![(0, PAGE_SIZE), (20, PAGE_SIZE), (40, PAGE_SIZE)]
    );
    assert!(!store.state().list_loading);
}

#[tokio::test]
async fn test_second_request_while_loading_does_not_fetch() {
    let catalog = FakeCatalog::with_pages(vec![Ok(page(1, 20))]);
    let loader = Loader::new(catalog.clone());
    let mut store = new_store();

    let first = store.dispatch(Action::ListLoadNext);
    let second = store.dispatch(Action::ListLoadNext);
    assert_eq!(first.effects.len(), 1);
    assert!(!second.changed);
    assert!(second.effects.is_empty());

    for effect in first.effects {
        let action = loader.run(effect).await;
        store.dispatch(action);
    }

    assert_eq!(catalog.requests().len(), 1);
    assert_eq!(store.state().items.len(), 20);
    assert_eq!(store.state().phase(), ListPhase::Idle);
}

#[tokio::test]
async fn test_full_partial_then_empty_page() {
    let catalog = FakeCatalog::with_pages(vec![Ok(page(1, 20)), Ok(page(21, 5)), Ok(Vec::new())]);
    let loader = Loader::new(catalog.clone());
    let mut store = new_store();

    drive(&mut store, &loader, Action::Init).await;
    assert_eq!(store.state().items.len(), 20);
    assert_eq!(store.state().current_page, 1);
    assert!(store.state().has_more);

    drive(&mut store, &loader, Action::ListLoadNext).await;
    assert_eq!(store.state().items.len(), 25);
    assert_eq!(store.state().current_page, 2);
    assert!(store.state().has_more);

    drive(&mut store, &loader, Action::ListLoadNext).await;
    assert_eq!(store.state().items.len(), 25);
    assert!(!store.state().has_more);
    assert!(!store.state().list_loading);

    // Exhausted: scrolling to the end no longer asks for pages.
    drive(&mut store, &loader, Action::SelectionJumpBottom).await;
    assert_eq!(catalog.requests().len(), 3);
}

#[tokio::test]
async fn test_failed_page_keeps_items_and_page() {
    let catalog = FakeCatalog::with_pages(vec![
        Ok(page(1, 20)),
        Err(CatalogError::Transport("connection refused".into())),
        Ok(page(21, 20)),
    ]);
    let loader = Loader::new(catalog.clone());
    let mut store = new_store();

    drive(&mut store, &loader, Action::Init).await;
    drive(&mut store, &loader, Action::ListLoadNext).await;

    let state = store.state();
    assert_eq!(state.items.len(), 20);
    assert_eq!(state.current_page, 1);
    assert!(!state.list_loading);
    assert_eq!(state.phase(), ListPhase::Error);
    assert!(!state.last_error.as_ref().unwrap().to_string().is_empty());

    // Manual retry asks for the same offset again and recovers.
    drive(&mut store, &loader, Action::ListLoadNext).await;
    assert_eq!(catalog.requests()[1], catalog.requests()[2]);
    assert_eq!(store.state().items.len(), 40);
    assert_eq!(store.state().last_error, None);
}

#[tokio::test]
async fn test_scrolling_to_end_loads_next_page() {
    let catalog = FakeCatalog::with_pages(vec![Ok(page(1, 20)), Ok(page(21, 20))]);
    let loader = Loader::new(catalog.clone());
    let mut store = new_store();
    drive(&mut store, &loader, Action::Init).await;

    for _ in 0..18 {
        drive(&mut store, &loader, Action::SelectionMove(1)).await;
    }
    assert_eq!(catalog.requests().len(), 1);

    drive(&mut store, &loader, Action::SelectionMove(1)).await;
    assert_eq!(catalog.requests(), vec![(0, PAGE_SIZE), (20, PAGE_SIZE)]);
    assert_eq!(store.state().items.len(), 40);
    assert_eq!(store.state().selected_index, 19);
}

#[tokio::test]
async fn test_detail_loads_once_and_survives_missing_id() {
    let catalog = FakeCatalog::with_pages(Vec::new());
    let loader = Loader::new(catalog.clone());
    let mut store = new_store();

    drive(&mut store, &loader, Action::DetailOpen(25)).await;
    assert_eq!(store.state().current_detail(), Some(&pikachu()));

    drive(&mut store, &loader, Action::DetailClose).await;
    drive(&mut store, &loader, Action::DetailOpen(25)).await;
    assert_eq!(catalog.detail_calls.load(Ordering::SeqCst), 1);

    drive(&mut store, &loader, Action::DetailOpen(9999)).await;
    let state = store.state();
    assert_eq!(state.detail.as_ref().map(|d| d.id), Some(25));
    assert!(!state.detail_loading);
    assert!(state.message.as_deref().unwrap().contains("no pokemon with id 9999"));
}
