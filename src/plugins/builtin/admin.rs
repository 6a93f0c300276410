use crate::application::errors::HandlerError;
use crate::domain::entities::{CommandContext, CommandDefinition, Permission};
use crate::plugins::host::PluginHost;
use crate::plugins::trait_def::Plugin;

const USAGE: &str = "Usage: plugins list | enable <name> | disable <name> | reload <name> | unload <name> | delete <name> | run <name> <task>";

/// `/plugins` - owner-only plugin management
pub struct AdminPlugin {
    host: PluginHost,
}

impl AdminPlugin {
    pub fn new(host: PluginHost) -> Self {
        Self { host }
    }
}

impl Plugin for AdminPlugin {
    fn name(&self) -> &str {
        "plugins"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Plugin management"
    }

    fn plugin_type(&self) -> &str {
        "universal"
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        let host = self.host.clone();
        vec![CommandDefinition::new("plugins", move |ctx| {
            let host = host.clone();
            async move {
                match manage(&host, &ctx).await {
                    Ok(reply) => {
                        ctx.reply(&reply).await?;
                        Ok(())
                    }
                    Err(e) => {
                        ctx.reply(USAGE).await?;
                        Err(e)
                    }
                }
            }
        })
        .with_description("Manage plugins")
        .with_permission(Permission::Owner)]
    }
}

/// Reply text for one `/plugins` invocation. Unknown sub-commands are invalid arguments.
async fn manage(host: &PluginHost, ctx: &CommandContext) -> Result<String, HandlerError> {
    let args: Vec<&str> = ctx.args.iter().map(String::as_str).collect();
    let result = match args.as_slice() {
        [] | ["list"] => return Ok(list(host)),
        ["enable", name] => host.enable_plugin(name).await.map(|_| format!("Enabled {}", name)),
        ["disable", name] => host.disable_plugin(name).await.map(|_| format!("Disabled {}", name)),
        ["unload", name] => host.unload_plugin(name).await.map(|_| format!("Unloaded {}", name)),
        ["delete", name] => host.delete_plugin(name).await.map(|_| format!("Deleted {}", name)),
        ["reload", name] => host.reload_plugin(name).await.map(|report| {
            let mut msg = format!("Reloaded, {} plugin(s) loaded", report.loaded.len());
            if !report.errors.is_empty() {
                msg.push_str(&format!(", {} skipped", report.errors.len()));
            }
            msg
        }),
        ["run", name, task] => host
            .run_plugin_task(name, task)
            .await
            .map(|_| format!("Ran {}/{}", name, task)),
        _ => return Err(HandlerError::InvalidArgs(format!("plugins {}", args.join(" ")))),
    };
    Ok(result.unwrap_or_else(|e| {
        tracing::warn!(command = "plugins", "{}", e);
        format!("Failed: {}", e)
    }))
}

fn list(host: &PluginHost) -> String {
    let plugins = host.list_plugins();
    if plugins.is_empty() {
        return "No plugins loaded".to_string();
    }
    let mut out = format!("{} plugin(s) loaded:\n", plugins.len());
    for p in plugins {
        out.push_str(&format!("  {} v{} ({}) - {}\n", p.name, p.version, p.plugin_type, p.description));
    }
    out.trim_end().to_string()
}
