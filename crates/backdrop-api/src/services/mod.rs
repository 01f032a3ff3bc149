pub mod catalog_refresh;
