use super::csv::command_reader::{CommandRecord, Operation};
use crate::application::canteen::Canteen;
use crate::error::Result;
use tracing::debug;

/// Executes command-file rows against a [`Canteen`], one at a time.
pub struct BatchRunner<'a> {
    canteen: &'a Canteen,
}

impl<'a> BatchRunner<'a> {
    pub fn new(canteen: &'a Canteen) -> Self {
        Self { canteen }
    }

    /// Runs one command as its `actor`. The actor's role comes from storage.
    pub async fn execute(&self, cmd: &CommandRecord) -> Result<()> {
        let actor = self.canteen.identify(cmd.actor).await?;
        let canteen = self.canteen;

        match cmd.op {
            Operation::TopUp => {
                canteen
                    .top_up_balance(&actor, cmd.target()?, cmd.amount()?)
                    .await?;
            }
            Operation::AddToCart => {
                canteen
                    .add_to_cart(&actor, cmd.target()?, cmd.quantity()?)
                    .await?;
            }
            Operation::UpdateCartItem => {
                canteen
                    .update_cart_item(&actor, cmd.target()?, cmd.quantity()?)
                    .await?;
            }
            Operation::RemoveFromCart => {
                canteen.remove_from_cart(&actor, cmd.target()?).await?;
            }
            Operation::ClearCart => canteen.clear_cart(&actor).await?,
            Operation::Checkout => {
                canteen.checkout(&actor, cmd.method()?, cmd.amount).await?;
            }
            Operation::PlaceOrder => {
                canteen
                    .place_order(&actor, cmd.method()?, cmd.amount, &cmd.order_lines()?)
                    .await?;
            }
            Operation::StandOrder => {
                canteen
                    .create_stand_order(
                        &actor,
                        cmd.target()?,
                        cmd.method()?,
                        cmd.amount,
                        &cmd.order_lines()?,
                    )
                    .await?;
            }
            Operation::UpdateStatus => {
                canteen
                    .update_order_status(&actor, cmd.target()?, cmd.reference()?)
                    .await?;
            }
            Operation::UploadProof => {
                canteen
                    .upload_payment_proof(&actor, cmd.target()?, cmd.reference()?)
                    .await?;
            }
            Operation::Cancel => {
                canteen.cancel_order(&actor, cmd.target()?).await?;
            }
            Operation::Delete => {
                canteen.delete_order(&actor, cmd.target()?).await?;
            }
            Operation::Refund => {
                canteen.refund_order(&actor, cmd.target()?).await?;
            }
        }

        debug!(op = ?cmd.op, actor = cmd.actor, "command executed");
        Ok(())
    }
}
