use crate::domain::a001_activity::repository::ActivityRepository;

/// Общее состояние обработчиков
#[derive(Clone, Default)]
pub struct AppState {
    pub activities: ActivityRepository,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}
