//! Certificate operations

use tokio_util::sync::CancellationToken;
use vaultpair_errors::VaultResult;
use vaultpair_ports::{
    CertificateImport, CertificateRecord, DeletedRecord, ResourceProperties, Tags,
};

use crate::facade::VaultFacade;
use crate::paging::ListProgress;

impl VaultFacade {
    pub async fn get_certificate(
        &self,
        name: &str,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> VaultResult<CertificateRecord> {
        self.get_resource(&self.certificates, name, version, cancel)
            .await
    }

    /// Imports a certificate into every region.
    ///
    /// The fingerprint tag is computed over the imported certificate bytes.
    pub async fn set_certificate(
        &self,
        name: &str,
        certificate: &CertificateImport,
        tags: Option<Tags>,
        content_type: Option<String>,
        cancel: &CancellationToken,
    ) -> VaultResult<CertificateRecord> {
        self.set_resource(
            &self.certificates,
            name,
            certificate,
            tags,
            content_type,
            cancel,
        )
        .await
    }

    pub async fn list_certificates(
        &self,
        region_index: usize,
        on_progress: Option<ListProgress<'_>>,
        cancel: &CancellationToken,
    ) -> VaultResult<Vec<ResourceProperties>> {
        self.list_resources(&self.certificates, region_index, on_progress, cancel)
            .await
    }

    pub async fn list_certificate_versions(
        &self,
        name: &str,
        region_index: usize,
        cancel: &CancellationToken,
    ) -> VaultResult<Vec<ResourceProperties>> {
        self.list_versions(&self.certificates, name, region_index, cancel)
            .await
    }

    /// Deletes a certificate in every region and waits for the primary's
    /// delete to complete.
    pub async fn delete_certificate(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> VaultResult<DeletedRecord<CertificateRecord>> {
        self.delete_resource(&self.certificates, name, cancel).await
    }
}
