//! Demo bot: a dice-roll button driven by gateway payloads on stdin.
//!
//! Each stdin line is one gateway payload as JSON. Interaction responses the
//! components produce are printed to stdout, one JSON object per line.

use std::any::Any;
use std::io::BufRead;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use rich_components::types::{GatewayPayload, InteractionResponse};
use rich_components::{
    get_manager, BoxError, Bot, ButtonState, ComponentError, ComponentKind, ComponentSchema, Field,
    FieldValues, InteractionContext, ManagerConfig, RichComponent, TypeShape,
};

const DEFAULT_SIDES: i64 = 6;

/// A button that rolls a die with `sides` sides.
#[derive(Debug, Clone)]
struct RollButton {
    button: ButtonState,
    sides: i64,
}

#[async_trait]
impl RichComponent for RollButton {
    fn values(&self) -> FieldValues {
        self.button.values().with("sides", self.sides)
    }

    async fn callback(&mut self, ctx: &mut InteractionContext) -> Result<(), BoxError> {
        let sides = u32::try_from(self.sides)
            .ok()
            .filter(|s| *s > 0)
            .ok_or("a die needs at least one side")?;
        let result = (rand::random::<u32>() % sides) + 1;

        let manager = get_manager(Some("dice"));
        let again = manager.as_ui_component(&*self)?;
        ctx.send_message(
            format!("rolled a d{sides}: **{result}**"),
            vec![rich_components::types::action_row(vec![again])],
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ComponentSchema for RollButton {
    const KIND: ComponentKind = ComponentKind::Button;

    fn fields() -> Vec<Field> {
        let mut fields = ButtonState::default().with_label("Roll").fields();
        fields.push(Field::custom_id("sides", TypeShape::int()).with_default(DEFAULT_SIDES));
        fields
    }

    fn from_values(mut values: FieldValues) -> Result<Self, ComponentError> {
        Ok(RollButton {
            button: ButtonState::from_values(&mut values)?,
            sides: values.take("sides")?,
        })
    }
}

fn print_response(interaction_id: &str, response: &InteractionResponse) {
    match serde_json::to_string(response) {
        Ok(json) => println!("{{\"interaction\":\"{interaction_id}\",\"response\":{json}}}"),
        Err(e) => error!(error = %e, "failed to serialise response"),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let root = get_manager(None);
    match ManagerConfig::from_env() {
        Ok(config) => root.config(config),
        Err(e) => {
            error!(error = %e, "invalid component configuration");
            std::process::exit(1);
        }
    }

    let dice = get_manager(Some("dice"));
    if let Err(e) = dice.register::<RollButton>() {
        error!(error = %e, "failed to register components");
        std::process::exit(1);
    }

    let bot = Arc::new(Bot::new());
    if let Err(e) = root.add_to_bot(&bot) {
        error!(error = %e, "failed to bind components");
        std::process::exit(1);
    }

    let d20 = RollButton {
        button: ButtonState::default().with_label("Roll a d20"),
        sides: 20,
    };
    match dice.make_custom_id(&d20) {
        Ok(custom_id) => info!(custom_id = ?custom_id, "send a button interaction with this custom id"),
        Err(e) => warn!(error = %e, "failed to encode demo button"),
    }

    // Stdin is read on its own thread and fed through a channel, like a
    // gateway connection.
    let (tx, rx) = async_channel::unbounded::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send_blocking(line).is_err() {
                break;
            }
        }
    });

    futures_lite::future::block_on(async {
        while let Ok(line) = rx.recv().await {
            if line.trim().is_empty() {
                continue;
            }
            let payload = match serde_json::from_str::<GatewayPayload>(&line) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "skipping malformed payload");
                    continue;
                }
            };

            bot.handle_payload(payload).await;
            for (interaction_id, response) in bot.take_responses() {
                print_response(&interaction_id, &response);
            }
        }
        info!("input closed, shutting down");
    });
}
