pub mod books;
pub mod players;
pub mod points;
pub mod rankings;

use bookquest_db::SharedStore;
use bookquest_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, store: &SharedStore) {
    registry.register(players::create_module(store.clone()));
    registry.register(books::create_module(store.clone()));
    registry.register(rankings::create_module(store.clone()));
    registry.register(points::create_module(store.clone()));
}
