pub mod reconcile_worker;
