pub mod db;
pub mod joutai;
pub mod quizapi;
pub mod shitsumon;
pub mod store;
pub mod view;
