pub mod ssrf_validation;
