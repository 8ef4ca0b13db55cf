//! Contract checks shared by every adapter's tests.

use super::{AllowFullTable, Cache};

/// Walk one adapter through the full cache contract. Clears the table.
pub(crate) async fn check_contract(cache: &dyn Cache) {
    cache.set_compression(false);
    cache.clear(AllowFullTable).await.unwrap();

    assert_eq!(cache.lookup("req:1").await.unwrap(), None);

    cache.store("req:1", &[0x01, 0x02, 0x03]).await.unwrap();
    assert_eq!(cache.lookup("req:1").await.unwrap(), Some(vec![0x01, 0x02, 0x03]));

    cache.store("req:1", &[0xFF]).await.unwrap();
    assert_eq!(cache.lookup("req:1").await.unwrap(), Some(vec![0x01, 0x02, 0x03]));

    cache.store("req:raw", b"<html>written before compression</html>").await.unwrap();

    cache.set_compression(true);
    let page = b"<tr><td>cell</td></tr>".repeat(64);
    cache.store("req:2", &page).await.unwrap();
    assert_eq!(cache.lookup("req:2").await.unwrap(), Some(page));

    let err = cache.lookup("req:raw").await.unwrap_err();
    assert!(err.is_fatal());
    cache.set_compression(false);

    assert_eq!(cache.clear(AllowFullTable).await.unwrap(), 3);
    for key in ["req:1", "req:2", "req:raw"] {
        assert_eq!(cache.lookup(key).await.unwrap(), None);
    }
}
