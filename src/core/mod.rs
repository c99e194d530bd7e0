pub mod auth;
pub mod challenge;
pub mod db;
pub mod import;
pub mod link;
pub mod participant;
pub mod profile;
pub mod settings;
pub mod submission;
