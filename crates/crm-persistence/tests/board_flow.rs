use crm_core::CrmError;
use crm_domain::{
    BoardStore, DealCategory, DragController, DragOutcome, DropTarget, NewDeal,
    NotificationCenter, NotificationKind, PipelineStore, Point, ReconciliationClient,
    StageColor, StageManager, StageOrder, StageOutcome,
};
use crm_persistence::{JsonFileStore, MemoryStore};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

async fn loaded_board<S: PipelineStore + ?Sized>(store: &S) -> BoardStore {
    let mut board = BoardStore::new();
    board.load_all(store).await.unwrap();
    board
}

fn drag(controller: &mut DragController, board: &mut BoardStore, id: uuid::Uuid, stage: &str) {
    controller.press(id, Point::new(0.0, 0.0)).unwrap();
    controller.pointer_move(Point::new(0.0, 12.0), board).unwrap();
    controller
        .drag_over(&DropTarget::Column(stage.into()), board)
        .unwrap();
}

#[tokio::test]
async fn test_move_is_committed_to_store() {
    let store = Arc::new(MemoryStore::new());
    let deal = store
        .create_deal(NewDeal::new("Seguro auto Maria", "NOVO"))
        .await
        .unwrap();
    let mut board = loaded_board(store.as_ref()).await;
    let mut controller = DragController::default();
    let mut notifications = NotificationCenter::new();
    let client = ReconciliationClient::new(store.clone());

    drag(&mut controller, &mut board, deal.id, "COTACAO");
    let outcome = controller
        .finish(
            Some(&DropTarget::Column("COTACAO".into())),
            &mut board,
            &client,
            &mut notifications,
        )
        .await
        .unwrap();

    assert!(matches!(outcome, DragOutcome::Committed(_)));
    assert_eq!(board.deal(deal.id).unwrap().stage, "COTACAO");
    let stored = store.get_deal(deal.id).await.unwrap().unwrap();
    assert_eq!(stored.stage, "COTACAO");
    assert_eq!(store.stage_update_count().await, 1);
}

#[tokio::test]
async fn test_failed_commit_restores_board() {
    let store = Arc::new(MemoryStore::new());
    let deal = store
        .create_deal(NewDeal::new("Plano empresarial", "NOVO"))
        .await
        .unwrap();
    let mut board = loaded_board(store.as_ref()).await;
    let mut controller = DragController::default();
    let mut notifications = NotificationCenter::new();
    let client = ReconciliationClient::new(store.clone());
    store.fail_next_stage_updates(1).await;

    drag(&mut controller, &mut board, deal.id, "COTACAO");
    let outcome = controller
        .finish(
            Some(&DropTarget::Column("COTACAO".into())),
            &mut board,
            &client,
            &mut notifications,
        )
        .await
        .unwrap();

    match outcome {
        DragOutcome::RolledBack { error, .. } => {
            assert!(matches!(error, CrmError::Reconcile { .. }))
        }
        other => panic!("expected RolledBack, got {:?}", other),
    }
    assert_eq!(board.deal(deal.id).unwrap().stage, "NOVO");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications.active()[0].kind, NotificationKind::Rollback);
    assert_eq!(store.get_deal(deal.id).await.unwrap().unwrap().stage, "NOVO");
}

#[tokio::test]
async fn test_slow_store_times_out_and_rolls_back() {
    let store = Arc::new(MemoryStore::new());
    let deal = store
        .create_deal(NewDeal::new("Vida em grupo", "NOVO"))
        .await
        .unwrap();
    let mut board = loaded_board(store.as_ref()).await;
    let mut controller = DragController::default();
    let mut notifications = NotificationCenter::new();
    let client = ReconciliationClient::new(store.clone()).with_timeout(Duration::from_millis(20));
    store.set_latency(Some(Duration::from_millis(500))).await;

    drag(&mut controller, &mut board, deal.id, "GANHO");
    let outcome = controller
        .finish(
            Some(&DropTarget::Column("GANHO".into())),
            &mut board,
            &client,
            &mut notifications,
        )
        .await
        .unwrap();

    match outcome {
        DragOutcome::RolledBack { error, .. } => match error {
            CrmError::Reconcile { source, .. } => {
                assert!(matches!(*source, CrmError::Timeout(_)))
            }
            other => panic!("expected Reconcile, got {:?}", other),
        },
        other => panic!("expected RolledBack, got {:?}", other),
    }
    assert_eq!(board.deal(deal.id).unwrap().stage, "NOVO");
}

#[tokio::test]
async fn test_release_over_nothing_never_reaches_store() {
    let store = Arc::new(MemoryStore::new());
    let deal = store
        .create_deal(NewDeal::new("Consórcio imóvel", "NOVO"))
        .await
        .unwrap();
    let mut board = loaded_board(store.as_ref()).await;
    let mut controller = DragController::default();
    let mut notifications = NotificationCenter::new();
    let client = ReconciliationClient::new(store.clone());

    drag(&mut controller, &mut board, deal.id, "COTACAO");
    let outcome = controller
        .finish(None, &mut board, &client, &mut notifications)
        .await
        .unwrap();

    assert!(matches!(outcome, DragOutcome::Cancelled { .. }));
    assert_eq!(board.deal(deal.id).unwrap().stage, "NOVO");
    assert_eq!(store.stage_update_count().await, 0);
}

#[tokio::test]
async fn test_background_reload_keeps_in_flight_move() {
    let store = Arc::new(MemoryStore::new());
    let deal = store
        .create_deal(NewDeal::new("Auto frota", "NOVO"))
        .await
        .unwrap();
    let mut board = loaded_board(store.as_ref()).await;
    let mut controller = DragController::default();

    drag(&mut controller, &mut board, deal.id, "FECHAMENTO");
    controller
        .drop(Some(&DropTarget::Column("FECHAMENTO".into())), &mut board)
        .unwrap();

    board.load_all(store.as_ref()).await.unwrap();
    assert_eq!(board.deal(deal.id).unwrap().stage, "NOVO");
    board.apply_overlay(&controller.optimistic_overlay());
    assert_eq!(board.deal(deal.id).unwrap().stage, "FECHAMENTO");
}

#[tokio::test]
async fn test_reload_during_drag_keeps_hovered_column() {
    let store = Arc::new(MemoryStore::new());
    let deal = store
        .create_deal(NewDeal::new("Residencial Silva", "NOVO"))
        .await
        .unwrap();
    let mut board = loaded_board(store.as_ref()).await;
    let mut controller = DragController::default();

    drag(&mut controller, &mut board, deal.id, "COTACAO");
    board.load_all(store.as_ref()).await.unwrap();
    board.apply_overlay(&controller.optimistic_overlay());
    assert_eq!(board.deal(deal.id).unwrap().stage, "COTACAO");

    // A reload that skipped the overlay is corrected on release.
    board.load_all(store.as_ref()).await.unwrap();
    assert_eq!(board.deal(deal.id).unwrap().stage, "NOVO");
    controller
        .drop(Some(&DropTarget::Column("COTACAO".into())), &mut board)
        .unwrap();
    assert!(controller.is_reconciling(deal.id));
    assert_eq!(board.deal(deal.id).unwrap().stage, "COTACAO");
}

#[tokio::test]
async fn test_stage_management_on_file_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    let store = Arc::new(JsonFileStore::new(&path));
    let manager = StageManager::new(store.clone());

    let created = manager
        .create_stage("Em Negociação", StageColor::Purple, StageOutcome::Open)
        .await
        .unwrap();
    assert_eq!(created.id, "em-negociacao");
    assert_eq!(created.order, 5);

    let mut deal = NewDeal::new("Seguro residencial", "COTACAO");
    deal.category = DealCategory::Empresarial;
    deal.value = Some(Decimal::new(150_000, 2));
    store.create_deal(deal).await.unwrap();

    let before = manager.list_stages().await.unwrap();
    let err = manager.delete_stage("COTACAO").await.unwrap_err();
    assert!(matches!(err, CrmError::StageInUse { deal_count: 1, .. }));
    assert_eq!(manager.list_stages().await.unwrap(), before);

    let reordered = manager
        .reorder_stages(vec![
            StageOrder::new("em-negociacao", 0),
            StageOrder::new("NOVO", 5),
        ])
        .await
        .unwrap();
    let ids: Vec<_> = reordered.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        ["em-negociacao", "COTACAO", "FECHAMENTO", "GANHO", "PERDIDO", "NOVO"]
    );

    let reopened = JsonFileStore::new(&path);
    let stages = reopened.list_stages().await.unwrap();
    assert_eq!(stages, reordered);

    let board = loaded_board(&reopened).await;
    let summary = board
        .column_summaries()
        .into_iter()
        .find(|c| c.stage_id == "COTACAO")
        .unwrap();
    assert_eq!(summary.deal_count, 1);
    assert_eq!(summary.total_value, Decimal::new(150_000, 2));
}
