pub mod bar;
pub mod market;
pub mod price_series;
pub mod record;
pub mod report;
