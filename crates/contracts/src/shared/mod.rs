pub mod choices;
pub mod field_path;
pub mod form_settings;
pub mod json_tree;
pub mod metadata;
