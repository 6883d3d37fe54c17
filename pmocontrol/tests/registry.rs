use std::sync::Arc;

use pmocontrol::{PlayerControl, PlayerRegistry};
use tokio::sync::mpsc;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unregister_during_broadcast_keeps_other_delivery() {
    for _ in 0..50 {
        let (registry, _statuses) = PlayerRegistry::new();
        let registry = Arc::new(registry);

        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = registry.register(tx_a).await;
        registry.register(tx_b).await;

        let unregister = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.unregister(a).await })
        };
        let delivered = registry.broadcast(PlayerControl::Play).await;
        assert!(unregister.await.unwrap());

        // A peut avoir reçu ou non la commande, B l'a toujours reçue
        assert!((1..=2).contains(&delivered));
        assert_eq!(rx_b.recv().await, Some(PlayerControl::Play));
        assert_eq!(registry.len().await, 1);
    }
}

#[tokio::test]
async fn test_registered_player_gets_later_broadcasts() {
    let (registry, _statuses) = PlayerRegistry::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    assert_eq!(registry.broadcast(PlayerControl::Pause).await, 0);
    registry.register(tx).await;
    assert_eq!(registry.broadcast(PlayerControl::Play).await, 1);

    assert_eq!(rx.recv().await, Some(PlayerControl::Play));
    assert!(rx.try_recv().is_err());
}
