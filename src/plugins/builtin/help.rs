use crate::domain::entities::CommandDefinition;
use crate::plugins::host::PluginHost;
use crate::plugins::trait_def::Plugin;

/// `/help` - lists every visible command grouped by plugin
pub struct HelpPlugin {
    host: PluginHost,
}

impl HelpPlugin {
    pub fn new(host: PluginHost) -> Self {
        Self { host }
    }
}

impl Plugin for HelpPlugin {
    fn name(&self) -> &str {
        "help"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Lists available commands"
    }

    fn plugin_type(&self) -> &str {
        "universal"
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        let host = self.host.clone();
        vec![CommandDefinition::new("help", move |ctx| {
            let host = host.clone();
            async move {
                let mut help = String::from("Available commands:\n");
                for plugin in host.list_plugins() {
                    let visible: Vec<_> = plugin.commands.iter().filter(|c| c.show_in_help).collect();
                    if visible.is_empty() {
                        continue;
                    }
                    help.push_str(&format!("\n[{}]\n", plugin.name));
                    for cmd in visible {
                        help.push_str(&format!("  {}{} - {}\n", ctx.prefix, cmd.name, cmd.description));
                    }
                }
                ctx.reply(help.trim_end()).await?;
                Ok(())
            }
        })
        .with_description("Show this message")]
    }
}
