pub use entity_api::post::{create, find_by_id, find_by_subtable};
