//! End-to-end tests for the plugin runtime
//! Run with: cargo test --test runtime_test

use std::fs;
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use carik_runtime::application::errors::{HandlerError, PluginError};
use carik_runtime::application::services::{AccessOverride, AccountMode, RuntimeSettings};
use carik_runtime::domain::entities::{
    CommandDefinition, CommandScope, Message, Permission, ScopeClass, Update, UpdateHandlerDefinition,
    UpdateKind, User,
};
use carik_runtime::infrastructure::adapters::MemoryTransport;
use carik_runtime::infrastructure::storage::JsonStore;
use carik_runtime::plugins::{ManagerOptions, Plugin, PluginCatalog, PluginLoader, PluginManager};
use carik_runtime::UpdateDispatcher;

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

const OWNER: &str = "1000";
const ADMIN: &str = "2000";
const STRANGER: &str = "3000";
const SELF_ID: &str = "42";

/// (plugin, command or handler, args)
type Calls = Arc<Mutex<Vec<(String, String, Vec<String>)>>>;

/// Test plugin configured from its manifest settings
struct Recorder {
    name: String,
    commands: Vec<String>,
    scope: CommandScope,
    permission: Permission,
    on_edit: Option<String>,
    calls: Calls,
}

#[async_trait]
impl Plugin for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "records invocations"
    }

    fn plugin_type(&self) -> &str {
        "universal"
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        self.commands
            .iter()
            .map(|cmd| {
                let calls = Arc::clone(&self.calls);
                CommandDefinition::new(cmd.clone(), move |ctx| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls
                            .lock()
                            .unwrap()
                            .push((ctx.plugin.clone(), ctx.command.clone(), ctx.args.clone()));
                        Ok(())
                    }
                })
                .with_scope(self.scope.clone())
                .with_permission(self.permission)
            })
            .collect()
    }

    fn update_handlers(&self) -> Vec<UpdateHandlerDefinition> {
        let Some(behaviour) = self.on_edit.clone() else {
            return Vec::new();
        };
        let calls = Arc::clone(&self.calls);
        vec![UpdateHandlerDefinition::new(UpdateKind::EditedMessage, move |ctx| {
            let calls = Arc::clone(&calls);
            let behaviour = behaviour.clone();
            async move {
                match behaviour.as_str() {
                    "fail" => return Err(HandlerError::Failed("edit handler failed".to_string())),
                    "panic" => panic!("edit handler panicked"),
                    "slow" => tokio::time::sleep(Duration::from_millis(400)).await,
                    _ => {}
                }
                calls
                    .lock()
                    .unwrap()
                    .push((ctx.plugin.clone(), "edit".to_string(), Vec::new()));
                Ok(())
            }
        })]
    }
}

struct Runtime {
    dir: tempfile::TempDir,
    manager: Arc<PluginManager>,
    dispatcher: UpdateDispatcher,
    transport: Arc<MemoryTransport>,
    calls: Calls,
}

impl Runtime {
    fn write(&self, file: &str, yaml: &str) {
        let path = self.dir.path().join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, yaml).unwrap();
    }

    async fn send(&self, chat_id: &str, sender: &str, text: &str) -> carik_runtime::DispatchReport {
        let message = Message::from_text(chat_id, text).with_sender(User::new(sender));
        self.dispatcher.dispatch(Update::new_message(message)).await
    }

    fn calls(&self) -> Vec<(String, String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

async fn runtime(mode: AccountMode) -> Runtime {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));

    let mut catalog = PluginCatalog::with_builtins();
    let c = Arc::clone(&calls);
    catalog.register("recorder", move |ctx| {
        let s = &ctx.settings;
        let commands: Vec<String> = s["commands"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let scope: CommandScope = serde_json::from_value(s["scope"].clone()).unwrap_or_default();
        let permission: Permission = serde_json::from_value(s["permission"].clone()).unwrap_or_default();
        Ok(Box::new(Recorder {
            name: s["name"].as_str().unwrap_or("recorder").to_string(),
            commands,
            scope,
            permission,
            on_edit: s["on_edit"].as_str().map(str::to_string),
            calls: Arc::clone(&c),
        }) as Box<dyn Plugin>)
    });

    let settings = RuntimeSettings::new(Arc::new(JsonStore::in_memory()));
    settings.seed_owner(OWNER).await.unwrap();
    settings.set_account_mode(mode).await.unwrap();
    settings
        .store()
        .update(
            "admin",
            Box::new(|_: Option<serde_json::Value>| {
                serde_json::json!({ "superAdmin": OWNER, "admins": [ADMIN] })
            }),
        )
        .await
        .unwrap();

    let transport = Arc::new(MemoryTransport::new(SELF_ID, "mybot"));
    let manager = PluginManager::new(
        catalog,
        PluginLoader::new(dir.path()),
        transport.clone(),
        settings,
        ManagerOptions {
            handler_timeout: Some(Duration::from_secs(5)),
        },
    );
    let dispatcher = UpdateDispatcher::new(Arc::clone(&manager));

    Runtime {
        dir,
        manager,
        dispatcher,
        transport,
        calls,
    }
}

#[tokio::test]
async fn test_echo_command_receives_args() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write(
        "echo.yaml",
        "entry: recorder\nsettings:\n  name: echo\n  commands: [echo]\n  scope: all\n  permission: all\n",
    );
    rt.manager.load_all().await.unwrap();

    let report = rt.send("chat", STRANGER, "!echo hi").await;
    assert_eq!(report.command.as_deref(), Some("echo"));
    assert_eq!(report.invoked, vec!["echo"]);
    assert_eq!(
        rt.calls(),
        vec![("echo".to_string(), "echo".to_string(), vec!["hi".to_string()])]
    );
}

#[tokio::test]
async fn test_mention_for_other_bot_is_ignored() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write("ping.yaml", "entry: recorder\nsettings:\n  name: pinger\n  commands: [ping]\n");
    rt.manager.load_all().await.unwrap();

    let report = rt.send("group:1", STRANGER, "/ping@otherbot").await;
    assert!(report.command.is_none());
    assert!(rt.calls().is_empty());

    let report = rt.send("group:1", STRANGER, "/ping@mybot").await;
    assert_eq!(report.invoked, vec!["pinger"]);
}

#[tokio::test]
async fn test_same_command_in_two_plugins_runs_both() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write("a.yaml", "entry: recorder\nsettings:\n  name: first\n  commands: [stats]\n");
    rt.write("b.yaml", "entry: recorder\nsettings:\n  name: second\n  commands: [stats]\n");
    rt.manager.load_all().await.unwrap();

    let report = rt.send("chat", STRANGER, "/stats").await;
    assert_eq!(report.invoked, vec!["first", "second"]);
    assert_eq!(report.handled, 2);

    let mut plugins: Vec<String> = rt.calls().into_iter().map(|(p, _, _)| p).collect();
    plugins.sort();
    assert_eq!(plugins, vec!["first", "second"]);
}

#[tokio::test]
async fn test_scope_set_denies_group_and_replies() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write(
        "dm.yaml",
        "entry: recorder\nsettings:\n  name: dm\n  commands: [secret]\n  scope: [private, channel]\n",
    );
    rt.manager.load_all().await.unwrap();

    let report = rt.send("group:9", STRANGER, "/secret").await;
    assert!(report.invoked.is_empty());
    assert_eq!(report.denied.len(), 1);
    let sent = rt.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, "group:9");
    assert!(sent[0].text.contains("private, channel"));

    assert_eq!(rt.send("dm", STRANGER, "/secret").await.invoked, vec!["dm"]);
    assert_eq!(rt.send("channel:3", STRANGER, "/secret").await.invoked, vec!["dm"]);
}

#[tokio::test]
async fn test_owner_command_needs_owner() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write(
        "root.yaml",
        "entry: recorder\nsettings:\n  name: root\n  commands: [shutdown]\n  permission: owner\n",
    );
    rt.manager.load_all().await.unwrap();

    assert!(rt.send("chat", ADMIN, "/shutdown").await.invoked.is_empty());
    assert!(rt.send("chat", STRANGER, "/shutdown").await.invoked.is_empty());
    assert_eq!(rt.send("chat", OWNER, "/shutdown").await.invoked, vec!["root"]);
}

#[tokio::test]
async fn test_denial_reply_uses_typed_prefix() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write(
        "root.yaml",
        "entry: recorder\nsettings:\n  name: root\n  commands: [shutdown]\n  permission: owner\n",
    );
    rt.manager.load_all().await.unwrap();

    rt.send("chat", ADMIN, "!shutdown").await;
    let sent = rt.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "!shutdown is reserved for the owner");
}

#[tokio::test]
async fn test_self_operated_account_is_its_own_owner() {
    let rt = runtime(AccountMode::User).await;
    rt.write(
        "root.yaml",
        "entry: recorder\nsettings:\n  name: root\n  commands: [shutdown, open]\n  permission: owner\n",
    );
    rt.write("open.yaml", "entry: recorder\nsettings:\n  name: open\n  commands: [hello]\n");
    rt.manager.load_all().await.unwrap();

    assert_eq!(rt.send("chat", SELF_ID, "/shutdown").await.invoked, vec!["root"]);
    assert!(rt.send("chat", ADMIN, "/shutdown").await.invoked.is_empty());

    // Nominally open commands still need an admin on a personal account
    assert!(rt.send("chat", STRANGER, "/hello").await.invoked.is_empty());
    assert_eq!(rt.send("chat", ADMIN, "/hello").await.invoked, vec!["open"]);
}

#[tokio::test]
async fn test_persisted_override_replaces_declared_access() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write(
        "root.yaml",
        "entry: recorder\nsettings:\n  name: root\n  commands: [report]\n  permission: owner\n",
    );
    rt.manager.load_all().await.unwrap();
    assert!(rt.send("chat", STRANGER, "/report").await.invoked.is_empty());

    rt.manager
        .settings()
        .set_command_override(
            "report",
            AccessOverride {
                scope: Some(CommandScope::One(ScopeClass::Private)),
                permission: Some(Permission::All),
            },
        )
        .await
        .unwrap();

    assert_eq!(rt.send("chat", STRANGER, "/report").await.invoked, vec!["root"]);
    assert!(rt.send("group:1", STRANGER, "/report").await.invoked.is_empty());
}

#[tokio::test]
async fn test_caption_is_parsed_as_command() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write("img.yaml", "entry: recorder\nsettings:\n  name: img\n  commands: [sticker]\n");
    rt.manager.load_all().await.unwrap();

    let message = Message::new("chat").with_sender(User::new(STRANGER)).with_caption("/sticker big");
    let report = rt.dispatcher.dispatch(Update::new_message(message)).await;
    assert_eq!(report.invoked, vec!["img"]);
    assert_eq!(rt.calls()[0].2, vec!["big"]);
}

#[tokio::test]
async fn test_custom_prefixes_replace_defaults() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write("p.yaml", "entry: recorder\nsettings:\n  name: p\n  commands: [go]\n");
    rt.manager.load_all().await.unwrap();
    rt.manager
        .settings()
        .store()
        .update(
            "config",
            Box::new(|_: Option<serde_json::Value>| serde_json::json!({ "prefixes": [".", ">>"] })),
        )
        .await
        .unwrap();

    assert!(rt.send("chat", STRANGER, "/go").await.command.is_none());
    assert_eq!(rt.send("chat", STRANGER, ".go").await.invoked, vec!["p"]);
    assert_eq!(rt.send("chat", STRANGER, ">>go").await.invoked, vec!["p"]);
}

#[tokio::test]
async fn test_update_handlers_are_isolated_and_concurrent() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write("a.yaml", "entry: recorder\nsettings:\n  name: failing\n  on_edit: fail\n");
    rt.write("b.yaml", "entry: recorder\nsettings:\n  name: panicking\n  on_edit: panic\n");
    rt.write("c.yaml", "entry: recorder\nsettings:\n  name: slow-a\n  on_edit: slow\n");
    rt.write("d.yaml", "entry: recorder\nsettings:\n  name: slow-b\n  on_edit: slow\n");
    rt.write("e.yaml", "entry: recorder\nsettings:\n  name: fine\n  on_edit: ok\n");
    rt.manager.load_all().await.unwrap();

    let started = Instant::now();
    let update = Update::new(UpdateKind::EditedMessage).with_message(Message::from_text("chat", "edited"));
    let report = rt.dispatcher.dispatch(update).await;

    // Two 400ms handlers finishing well under 800ms means they overlapped
    assert!(started.elapsed() < Duration::from_millis(750));
    assert!(report.command.is_none());
    assert_eq!(report.handled, 5);

    let mut failed: Vec<&str> = report.failures.iter().map(|(p, _)| p.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["failing", "panicking"]);

    let mut ok: Vec<String> = rt.calls().into_iter().map(|(p, _, _)| p).collect();
    ok.sort();
    assert_eq!(ok, vec!["fine", "slow-a", "slow-b"]);
}

#[tokio::test]
async fn test_new_message_skips_edit_handlers() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write("e.yaml", "entry: recorder\nsettings:\n  name: editor\n  on_edit: ok\n  commands: [x]\n");
    rt.manager.load_all().await.unwrap();

    // Only edited_message handlers are registered, so a new message only routes the command
    let report = rt.send("chat", STRANGER, "/x").await;
    assert_eq!(report.handled, 1);
    assert_eq!(rt.calls()[0].1, "x");
}

#[tokio::test]
async fn test_disable_enable_reload_weather() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write("weather/plugin.yaml", "entry: recorder\nsettings:\n  name: weather\n  commands: [forecast]\n");
    rt.manager.load_all().await.unwrap();
    let host = rt.manager.host();
    assert!(host.has_plugin("weather"));

    host.disable_plugin("weather").await.unwrap();
    assert!(!host.has_plugin("weather"));
    assert!(rt.send("chat", STRANGER, "/forecast").await.invoked.is_empty());

    host.enable_plugin("weather").await.unwrap();
    host.reload_plugin("weather").await.unwrap();
    assert!(host.has_plugin("weather"));
    assert_eq!(rt.send("chat", STRANGER, "/forecast").await.invoked, vec!["weather"]);
}

#[tokio::test]
async fn test_delete_unknown_plugin_leaves_state_alone() {
    let rt = runtime(AccountMode::Bot).await;
    let before = rt.manager.settings().store().read("plugins").await.unwrap();

    let err = rt.manager.host().delete_plugin("nothing-here").await.unwrap_err();
    assert!(matches!(err, PluginError::NotFound(_)));
    assert_eq!(rt.manager.settings().store().read("plugins").await.unwrap(), before);
}

#[tokio::test]
async fn test_builtin_admin_and_help_plugins() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write("help.yaml", "entry: help\n");
    rt.write("plugins.yaml", "entry: plugins\n");
    rt.write("ping.yaml", "entry: ping\n");
    rt.manager.load_all().await.unwrap();

    rt.send("chat", STRANGER, "/ping").await;
    rt.send("chat", STRANGER, "!echo hello world").await;
    rt.send("chat", STRANGER, "/help").await;
    let sent: Vec<String> = rt.transport.sent().into_iter().map(|m| m.text).collect();
    assert_eq!(sent[0], "pong");
    assert_eq!(sent[1], "hello world");
    assert!(sent[2].contains("[ping]"));
    assert!(sent[2].contains("/echo - Repeat the given text"));

    // Management is owner-only
    let report = rt.send("chat", ADMIN, "/plugins disable ping").await;
    assert!(report.invoked.is_empty());
    assert!(rt.manager.has("ping"));

    rt.send("chat", OWNER, "/plugins disable ping").await;
    assert!(!rt.manager.has("ping"));
    assert!(rt.manager.settings().is_disabled("ping").await);

    rt.send("chat", OWNER, "/plugins enable ping").await;
    rt.send("chat", OWNER, "/plugins reload ping").await;
    assert!(rt.manager.has("ping"));

    let last = rt.transport.sent().last().cloned().unwrap();
    assert!(last.text.starts_with("Reloaded"));
}

#[tokio::test]
async fn test_builtin_usage_errors_are_reported() {
    let rt = runtime(AccountMode::Bot).await;
    rt.write("plugins.yaml", "entry: plugins\n");
    rt.write("ping.yaml", "entry: ping\n");
    rt.manager.load_all().await.unwrap();

    let report = rt.send("chat", STRANGER, "!echo").await;
    assert_eq!(report.invoked, vec!["ping"]);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].1, HandlerError::InvalidArgs(_)));

    let report = rt.send("chat", OWNER, "/plugins frobnicate ping").await;
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "plugins");
    assert!(matches!(report.failures[0].1, HandlerError::InvalidArgs(_)));

    let sent: Vec<String> = rt.transport.sent().into_iter().map(|m| m.text).collect();
    assert_eq!(sent[0], "Usage: !echo <text>");
    assert!(sent[1].starts_with("Usage: plugins list"));
    assert!(rt.manager.has("ping"));
}
