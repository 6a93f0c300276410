use crate::application::errors::HandlerError;
use crate::domain::entities::CommandDefinition;
use crate::plugins::trait_def::Plugin;

pub struct PingPlugin;

impl Plugin for PingPlugin {
    fn name(&self) -> &str {
        "ping"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Liveness checks"
    }

    fn plugin_type(&self) -> &str {
        "universal"
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        vec![
            CommandDefinition::new("ping", |ctx| async move {
                ctx.reply("pong").await?;
                Ok(())
            })
            .with_description("Check that the bot is alive"),
            CommandDefinition::new("echo", |ctx| async move {
                if ctx.args.is_empty() {
                    ctx.reply(&format!("Usage: {}echo <text>", ctx.prefix)).await?;
                    return Err(HandlerError::InvalidArgs("nothing to echo".to_string()));
                }
                ctx.reply(&ctx.args.join(" ")).await?;
                Ok(())
            })
            .with_description("Repeat the given text"),
        ]
    }
}
