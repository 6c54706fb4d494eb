pub mod error;
pub mod db_utils;
