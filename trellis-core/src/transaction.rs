//! Transaction coordination

use crate::executor::Adapter;
use crate::{Error, QueryBuilder, Result};
use futures::future::BoxFuture;
use once_cell::sync::OnceCell;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, warn};

const TARGET: &str = "trellis::transaction";

/// Outcome of a transaction so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// First adapter failure seen by any builder taking part in a transaction
#[derive(Debug, Clone, Default)]
pub(crate) struct FailureLatch(Arc<OnceCell<String>>);

impl FailureLatch {
    pub(crate) fn record(&self, err: &Error) {
        if self.0.set(err.to_string()).is_ok() {
            warn!(target: TARGET, error = %err, "statement failed inside transaction");
        }
    }

    pub(crate) fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }
}

/// Builder handed to a transaction's unit of work.
///
/// Dereferences to [`QueryBuilder`], so `tx.table("foo")` starts statements
/// that run inside the transaction. Only one of [`commit`](Self::commit) and
/// [`rollback`](Self::rollback) takes effect; later calls are ignored.
pub struct Transaction<A: Adapter> {
    builder: QueryBuilder<A>,
    latch: FailureLatch,
    state: TransactionState,
}

impl<A: Adapter> Transaction<A> {
    fn new(builder: QueryBuilder<A>, latch: FailureLatch) -> Self {
        Self {
            builder,
            latch,
            state: TransactionState::Open,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Commit now.
    ///
    /// If a statement already failed inside this transaction it is rolled
    /// back instead and [`Error::TransactionAborted`] is returned. A COMMIT
    /// the adapter rejects still finishes the transaction; no ROLLBACK
    /// follows it.
    pub async fn commit(&mut self) -> Result<()> {
        if self.state != TransactionState::Open {
            warn!(target: TARGET, state = ?self.state, "commit ignored, transaction already finished");
            return Ok(());
        }
        if let Some(message) = self.latch.get().map(str::to_owned) {
            self.rollback().await?;
            return Err(Error::transaction_aborted(message));
        }
        // finished once COMMIT is sent, even if the server rejects it
        self.state = TransactionState::Committed;
        self.builder.connection().adapter().commit().await?;
        debug!(target: TARGET, "transaction committed");
        Ok(())
    }

    /// Roll back now
    pub async fn rollback(&mut self) -> Result<()> {
        if self.state != TransactionState::Open {
            warn!(target: TARGET, state = ?self.state, "rollback ignored, transaction already finished");
            return Ok(());
        }
        self.state = TransactionState::RolledBack;
        self.builder.connection().adapter().rollback().await?;
        debug!(target: TARGET, "transaction rolled back");
        Ok(())
    }

    async fn rollback_after_failure(&mut self) {
        if let Err(err) = self.rollback().await {
            warn!(target: TARGET, error = %err, "rollback failed");
        }
    }
}

impl<A: Adapter> Deref for Transaction<A> {
    type Target = QueryBuilder<A>;

    fn deref(&self) -> &Self::Target {
        &self.builder
    }
}

impl<A: Adapter> DerefMut for Transaction<A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.builder
    }
}

impl<A: Adapter> QueryBuilder<A> {
    /// Run `work` inside `START TRANSACTION` ... `COMMIT`.
    ///
    /// The transaction commits when `work` returns `Ok` without finishing it
    /// explicitly. It rolls back when `work` returns an error, or when any
    /// statement issued through the transaction failed at the adapter even if
    /// `work` swallowed that error; the latter surfaces as
    /// [`Error::TransactionAborted`].
    ///
    /// # Examples
    /// ```no_run
    /// # async fn demo<A: trellis_core::Adapter>(db: trellis_core::QueryBuilder<A>) -> trellis_core::Result<()> {
    /// use futures::FutureExt;
    ///
    /// let id = db
    ///     .transaction(|tx| {
    ///         async move {
    ///             let id = tx.table("orders").insert(vec![("total", 42i32)]).await?;
    ///             tx.table("audit").insert(vec![("note", "order placed")]).await?;
    ///             Ok::<_, trellis_core::Error>(id)
    ///         }
    ///         .boxed()
    ///     })
    ///     .await?;
    /// # let _ = id;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn transaction<F, T>(&self, work: F) -> Result<T>
    where
        F: for<'t> FnOnce(&'t mut Transaction<A>) -> BoxFuture<'t, Result<T>>,
    {
        self.connection().adapter().begin_transaction().await?;
        debug!(target: TARGET, "transaction started");

        let latch = FailureLatch::default();
        let builder = self.new_query().with_latch(latch.clone());
        let mut tx = Transaction::new(builder, latch);

        let outcome = work(&mut tx).await;

        match outcome {
            Err(err) => {
                if tx.state == TransactionState::Open {
                    tx.rollback_after_failure().await;
                }
                Err(err)
            }
            Ok(value) if tx.state != TransactionState::Open => Ok(value),
            Ok(value) => match tx.latch.get().map(str::to_owned) {
                Some(message) => {
                    tx.rollback_after_failure().await;
                    Err(Error::transaction_aborted(message))
                }
                None => {
                    tx.commit().await?;
                    Ok(value)
                }
            },
        }
    }
}
