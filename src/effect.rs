#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    FetchPage { offset: usize, limit: usize },
    FetchDetail { id: u32 },
}
