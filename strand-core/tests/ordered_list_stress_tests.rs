use serial_test::serial;
use strand_core::DeferredGuard;
use strand_core::common_tests::ordered_list_stress_tests::*;

#[test]
#[serial(stress_tests)]
fn stress_concurrent_sorted_adds() {
    test_concurrent_sorted_adds::<DeferredGuard>();
}

#[test]
#[serial(stress_tests)]
fn stress_concurrent_unordered_adds() {
    test_concurrent_unordered_adds::<DeferredGuard>();
}

#[test]
#[serial(stress_tests)]
fn stress_insert_purge_race() {
    test_insert_purge_race::<DeferredGuard>();
}

#[test]
#[serial(stress_tests)]
fn stress_readers_during_mutation() {
    test_readers_during_mutation::<DeferredGuard>();
}

#[test]
#[serial(stress_tests)]
fn stress_concurrent_remove_same_value() {
    test_concurrent_remove_same_value::<DeferredGuard>();
}

#[test]
#[serial(stress_tests)]
fn stress_delete_undelete_churn() {
    test_delete_undelete_churn::<DeferredGuard>();
}

#[test]
#[serial(stress_tests)]
fn stress_clear_during_adds() {
    test_clear_during_adds::<DeferredGuard>();
}
