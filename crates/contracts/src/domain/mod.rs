pub mod a001_activity;
