mod main_loop;
mod snapshot_exporter;

pub use main_loop::start;
