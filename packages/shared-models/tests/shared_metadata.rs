use shared_models::{metadata, Metadata};

#[test]
fn every_caller_gets_the_same_metadata_object() {
    let first = metadata();
    let from_thread = std::thread::spawn(|| metadata() as *const Metadata as usize)
        .join()
        .expect("thread panicked");

    assert!(std::ptr::eq(first, metadata()));
    assert_eq!(first as *const Metadata as usize, from_thread);
}

#[test]
fn rebuilt_metadata_is_structurally_equal() {
    let rebuilt = Metadata::collect();

    assert_eq!(&rebuilt, metadata());
    assert_eq!(rebuilt.fingerprint(), metadata().fingerprint());
}

#[test]
fn users_is_the_only_registered_table() {
    assert_eq!(metadata().table_names(), vec!["users"]);
}
