pub mod a001_activity;
pub mod form_settings;
