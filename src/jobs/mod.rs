pub mod stock_probe_sync;
