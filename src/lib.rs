pub mod db;
pub mod policy;
pub mod runtime;
pub mod voting;
pub mod web;
