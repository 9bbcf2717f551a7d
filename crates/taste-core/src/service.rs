//! The `Taste` service: explicit owner of collaborators and resources.

use crate::acquire::{acquire_taste, AcquireReport};
use crate::checkout::{check_photo_out, check_photos_out, CheckOutError, CheckOutReport, PhotoCheckOut};
use crate::context::{Clients, Resources, TasteContext};
use crate::messages::{store_messages, Message, MessageError};
use crate::photos::{mental_snapshot, save_photo, PhotoError, SaveOptions, SavedPhoto};
use crate::provision::{provision, ProvisionError, ResourceConfig};
use crate::sync::{synchronize, SyncError, SyncReport};
use crate::types::Photo;
use tokio::sync::Mutex;

/// Entry point for every produced operation.
///
/// Holds a single-flight guard so that at most one synchronization pass runs
/// at a time; a second caller gets [`SyncError::InProgress`] instead of
/// racing the first on the same images. Acquisition waits for the same guard
/// because it indexes training images too.
pub struct Taste {
    ctx: TasteContext,
    sync_guard: Mutex<()>,
}

impl Taste {
    /// Wrap an already provisioned context.
    pub fn new(ctx: TasteContext) -> Self {
        Self {
            ctx,
            sync_guard: Mutex::new(()),
        }
    }

    /// Provision bucket and collection, then run the first sync.
    ///
    /// Provisioning failures abort startup. A failed first sync is logged and
    /// left for the next pass.
    pub async fn start(clients: Clients, config: &ResourceConfig) -> Result<Self, ProvisionError> {
        let resources = provision(&clients, config).await?;
        tracing::info!(
            bucket = %resources.bucket,
            collection = %resources.collection,
            "resources ready"
        );
        let taste = Self::new(TasteContext { clients, resources });
        if let Err(e) = taste.sync().await {
            tracing::error!(error = %e, "initial sync failed");
        }
        Ok(taste)
    }

    pub fn context(&self) -> &TasteContext {
        &self.ctx
    }

    pub fn resources(&self) -> &Resources {
        &self.ctx.resources
    }

    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        let Ok(_guard) = self.sync_guard.try_lock() else {
            tracing::warn!("sync requested while another pass is running");
            return Err(SyncError::InProgress);
        };
        synchronize(&self.ctx).await
    }

    pub async fn check_photo_out(
        &self,
        channel: &str,
        photo: &Photo,
    ) -> Result<PhotoCheckOut, CheckOutError> {
        check_photo_out(&self.ctx, channel, photo).await
    }

    pub async fn check_photos_out(
        &self,
        channel: &str,
        photos: &[Photo],
    ) -> Result<CheckOutReport, CheckOutError> {
        check_photos_out(&self.ctx, channel, photos).await
    }

    pub async fn acquire_taste(&self, photos: &[Photo]) -> AcquireReport {
        let _guard = self.sync_guard.lock().await;
        acquire_taste(&self.ctx, photos).await
    }

    pub async fn save_photo(
        &self,
        channel: &str,
        photo: &Photo,
        options: &SaveOptions,
    ) -> Result<SavedPhoto, PhotoError> {
        save_photo(&self.ctx, channel, photo, options).await
    }

    pub async fn mental_snapshot(&self, channel: &str, photo: &Photo) -> Result<String, PhotoError> {
        mental_snapshot(&self.ctx, channel, photo).await
    }

    pub async fn store_messages(&self, messages: &[Message]) -> Result<usize, MessageError> {
        store_messages(self.ctx.clients.messages.as_ref(), messages).await
    }
}
