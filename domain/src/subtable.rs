pub use entity_api::subtable::{create, find_all, find_by_id};
