// 画面遷移・終了確認・インストーラーの統合テスト

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use claude_monitor::{ActionError, App, AppOptions, DashboardModel, InstallTarget, View};
use claude_monitor_shared::{AppConfig, InstallationStatus};
use common::{scenario_instances, FakeBackend};
use tokio_test::{assert_err, assert_ok};

#[tokio::test(start_paused = true)]
async fn test_start_loads_and_polls_on_dashboard() {
    let backend = FakeBackend::with_instances(scenario_instances());
    backend.set_config(AppConfig {
        polling_interval_secs: 2,
        ..AppConfig::default()
    });
    let mut app = App::new(backend.clone(), AppOptions::default());

    app.start().await;

    assert_eq!(app.view(), View::Dashboard);
    assert!(app.is_polling());
    assert_eq!(FakeBackend::calls(&backend.list_calls), 1);

    tokio::time::sleep(Duration::from_millis(4100)).await;
    assert_eq!(FakeBackend::calls(&backend.list_calls), 3);
    app.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_leaving_dashboard_stops_polling() {
    let backend = FakeBackend::with_instances(scenario_instances());
    let mut app = App::new(backend.clone(), AppOptions::default());
    app.start().await;

    app.set_view(View::Hooks).await;
    assert!(!app.is_polling());

    let calls = FakeBackend::calls(&backend.list_calls);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(FakeBackend::calls(&backend.list_calls), calls);

    app.set_view(View::Dashboard).await;
    assert!(app.is_polling());
    app.shutdown();
    assert!(!app.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_auto_start_disabled_skips_polling() {
    let backend = FakeBackend::with_instances(scenario_instances());
    backend.set_config(AppConfig {
        auto_start_monitor: false,
        ..AppConfig::default()
    });
    let mut app = App::new(backend.clone(), AppOptions::default());
    app.start().await;

    assert!(!app.is_polling());
    // 手動更新は可能
    app.refresh().await;
    assert_eq!(FakeBackend::calls(&backend.list_calls), 2);
}

#[tokio::test(start_paused = true)]
async fn test_interval_override_wins_over_config() {
    let backend = FakeBackend::with_instances(vec![]);
    let mut app = App::new(
        backend.clone(),
        AppOptions {
            interval_override: Some(Duration::from_secs(1)),
        },
    );
    app.start().await;

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(FakeBackend::calls(&backend.list_calls), 1 + 3);
    app.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_dropping_app_stops_polling() {
    let backend = FakeBackend::with_instances(vec![]);
    let mut app = App::new(backend.clone(), AppOptions::default());
    app.start().await;
    drop(app);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(FakeBackend::calls(&backend.list_calls), 1);
}

#[tokio::test]
async fn test_not_installed_hides_instances() {
    let backend = FakeBackend::with_instances(scenario_instances());
    backend.set_installation(Some(InstallationStatus::not_installed()));
    let mut app = App::new(backend, AppOptions::default());
    app.start().await;

    assert_eq!(app.snapshot().await.instances.len(), 3);
    assert_eq!(app.dashboard().await, DashboardModel::NotInstalled);
    app.shutdown();
}

#[tokio::test]
async fn test_dashboard_groups_and_expansion() {
    let backend = FakeBackend::with_instances(scenario_instances());
    let mut app = App::new(backend.clone(), AppOptions::default());
    app.start().await;
    app.shutdown();

    assert!(app.toggle_group("/b"));
    let model = app.dashboard().await;
    let DashboardModel::Groups {
        instance_count,
        groups,
        ..
    } = model
    else {
        panic!("expected groups");
    };
    assert_eq!(instance_count, 3);
    assert_eq!(groups[0].key, "/a");
    assert!(!groups[0].expanded);
    assert!(groups[1].expanded);

    // 一覧が変わっても展開状態はキーで残る
    backend.set_instances(vec![common::create_test_instance(200, "/b", 1.0, 1.0)]);
    app.registry().load_instances().await;
    let model = app.dashboard().await;
    let group = model.group(1).expect("group");
    assert_eq!(group.key, "/b");
    assert!(group.expanded);
}

#[tokio::test]
async fn test_kill_requires_confirmation() {
    let backend = FakeBackend::with_instances(scenario_instances());
    let mut app = App::new(backend.clone(), AppOptions::default());
    app.start().await;
    app.shutdown();

    assert!(matches!(app.confirm_kill(), Err(ActionError::NotConfirmed)));

    app.request_kill(102);
    assert_eq!(app.cancel_kill(), Some(102));
    assert!(matches!(app.confirm_kill(), Err(ActionError::NotConfirmed)));
    assert_eq!(FakeBackend::calls(&backend.kill_calls), 0);

    app.request_kill(101);
    assert_eq!(app.pending_kill(), Some(101));
    let kill = match app.confirm_kill() {
        Ok(kill) => kill,
        Err(e) => panic!("confirm failed: {e}"),
    };
    assert_eq!(app.pending_kill(), None);
    assert_eq!(assert_ok!(kill.await), 101);

    let instances = app.snapshot().await.instances;
    assert_eq!(instances.len(), 2);
    assert!(instances.iter().all(|i| i.pid != 101));
}

#[tokio::test]
async fn test_failed_kill_is_returned_to_caller() {
    let backend = FakeBackend::with_instances(scenario_instances());
    backend.kill_fails.store(true, Ordering::SeqCst);
    let mut app = App::new(backend, AppOptions::default());
    app.start().await;
    app.shutdown();

    app.request_kill(100);
    let kill = match app.confirm_kill() {
        Ok(kill) => kill,
        Err(e) => panic!("confirm failed: {e}"),
    };
    let err = assert_err!(kill.await);
    assert!(err.to_string().contains("permission denied"));
    assert_eq!(app.snapshot().await.instances.len(), 3);
}

#[tokio::test]
async fn test_install_claude_refreshes_everything() {
    let backend = FakeBackend::with_instances(scenario_instances());
    backend.set_installation(Some(InstallationStatus::not_installed()));
    let mut app = App::new(backend.clone(), AppOptions::default());
    app.start().await;
    app.shutdown();
    assert_eq!(app.dashboard().await, DashboardModel::NotInstalled);

    assert_ok!(app.install(InstallTarget::Claude).await);

    assert_eq!(FakeBackend::calls(&backend.install_checks), 2);
    assert!(app.snapshot().await.gate.monitoring_available());
    assert!(matches!(
        app.dashboard().await,
        DashboardModel::Groups { .. }
    ));
}

#[tokio::test]
async fn test_installers_have_independent_busy_flags() {
    let backend = FakeBackend::with_instances(vec![]);
    let app = App::new(backend.clone(), AppOptions::default());
    let gate = FakeBackend::block(&backend.installer_gate);

    let node = tokio::spawn(app.install(InstallTarget::Node));
    while !app.installer().installing_node() {
        tokio::task::yield_now().await;
    }
    assert!(!app.installer().installing_claude());

    // 同じ対象は拒否
    let again = app.install(InstallTarget::Node).await;
    assert!(matches!(again, Err(ActionError::Busy(_))));
    assert_eq!(FakeBackend::calls(&backend.node_calls), 1);

    gate.notify_one();
    assert_ok!(assert_ok!(node.await));
    assert!(!app.installer().installing_node());

    // Node.js のインストール後は再取得しない
    assert_eq!(FakeBackend::calls(&backend.install_checks), 0);
}

#[tokio::test]
async fn test_installer_failure_is_reported() {
    let backend = FakeBackend::with_instances(vec![]);
    backend.installer_fails.store(true, Ordering::SeqCst);
    let app = App::new(backend, AppOptions::default());

    let err = assert_err!(app.install(InstallTarget::Node).await);
    assert!(matches!(
        err,
        ActionError::Installer {
            target: InstallTarget::Node,
            ..
        }
    ));
    assert!(!app.installer().installing_node());
}
