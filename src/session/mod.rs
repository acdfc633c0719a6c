//! The session orchestrator: drives PACE → (fallback BAC) → data-group
//! discovery → Chip Authentication → file reads → Active Authentication →
//! Passive Authentication over one chip session.

use {
    crate::{
        asn1::{security_info::SecurityInfos, EfSod},
        crypto::CryptoCoreRng,
        handshake::{active_authentication, bac, chip_authentication, pace},
        lds::{DataGroup, DataGroupContent, DataGroupId},
        passive,
        reader::{CancelFlag, TagReader, AID_EMRTD},
        transport::Transport,
        Error, Result,
    },
    rand::thread_rng,
    std::{
        collections::{BTreeMap, BTreeSet},
        sync::{Arc, Mutex},
    },
    tracing::{debug, info, warn},
};

/// Outcome of one authentication mechanism.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthStatus {
    #[default]
    NotDone,
    Success,
    Failed,
}

/// The output aggregate; built incrementally, never mutated after return.
#[derive(Debug, Default)]
pub struct DocumentResult {
    pub card_access: Option<SecurityInfos>,
    pub data_groups: BTreeMap<DataGroupId, DataGroup>,
    pub bac_status: AuthStatus,
    pub pace_status: AuthStatus,
    pub chip_authentication_status: AuthStatus,
    pub active_authentication_status: AuthStatus,
    pub passive_authentication_status: AuthStatus,
    /// DER of the Document Signer Certificate from EF.SOD.
    pub document_signer_certificate: Option<Vec<u8>>,
    /// Blake3 fingerprint of the SOD signature.
    pub document_hash: Option<[u8; 32]>,
    pub verification_errors: Vec<String>,
}

impl DocumentResult {
    pub fn data_group(&self, id: DataGroupId) -> Option<&DataGroup> {
        self.data_groups.get(&id)
    }

    fn sod(&self) -> Option<&EfSod> {
        match &self.data_groups.get(&DataGroupId::Sod)?.content {
            DataGroupContent::Sod(sod) => Some(sod),
            _ => None,
        }
    }

    fn dg14_infos(&self) -> Option<SecurityInfos> {
        match &self.data_groups.get(&DataGroupId::Dg14)?.content {
            DataGroupContent::SecurityInfos(dg14) => Some(dg14.0.clone()),
            _ => None,
        }
    }
}

/// Messages bridged to the host UI. The host may return an override string
/// from the display callback, or `None` to accept the default text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayMessage {
    RequestPresent,
    Authenticating(u8),
    ReadingDataGroup(DataGroupId, u8),
    Error(String),
    SuccessfulRead,
}

fn progress_bar(pct: u8) -> String {
    let filled = (pct.min(100) / 20) as usize;
    let mut bar = String::new();
    for _ in 0..filled {
        bar.push_str("🔵 ");
    }
    for _ in filled..5 {
        bar.push_str("⚪️ ");
    }
    bar
}

impl DisplayMessage {
    pub fn default_text(&self) -> String {
        match self {
            Self::RequestPresent => {
                "Please hold the document to the top of the phone.".into()
            }
            Self::Authenticating(pct) => {
                format!("Authenticating.....\n\n{}", progress_bar(*pct))
            }
            Self::ReadingDataGroup(dg, pct) => {
                format!("Reading {dg}.....\n\n{}", progress_bar(*pct))
            }
            Self::Error(message) => message.clone(),
            Self::SuccessfulRead => "NFC read successfully".into(),
        }
    }
}

pub type DisplayCallback = Box<dyn FnMut(&DisplayMessage) -> Option<String> + Send>;

/// Read configuration. The default reads everything EF.COM lists except the
/// secure-element data groups.
#[derive(Debug, Default)]
pub struct ReadOptions {
    /// Explicit data groups to read; empty means "all from EF.COM". COM and
    /// SOD are always included.
    pub data_groups: BTreeSet<DataGroupId>,
    /// Filter DG3/DG4 from the effective list. On by default.
    pub skip_secure_elements: Option<bool>,
    pub skip_chip_authentication: bool,
    pub skip_pace: bool,
    /// Lower the READ BINARY chunk size (floor 0x01).
    pub data_amount: Option<usize>,
    /// CSCA master list blob for Passive Authentication.
    pub master_list: Option<Vec<u8>>,
}

impl ReadOptions {
    fn skip_secure_elements(&self) -> bool {
        self.skip_secure_elements.unwrap_or(true)
    }
}

/// One `read_document` invocation's worth of state. Nothing here is process
/// global; dropping the session zeroes the key material and invalidates the
/// transport at most once.
pub struct Session<T: Transport> {
    reader:      TagReader<T>,
    options:     ReadOptions,
    cancel:      CancelFlag,
    display:     Arc<Mutex<DisplayCallback>>,
    invalidated: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, options: ReadOptions, display: DisplayCallback) -> Self {
        let cancel = CancelFlag::new();
        let mut reader = TagReader::new(transport, cancel.clone());
        if let Some(amount) = options.data_amount {
            reader.set_read_amount(amount);
        }
        Self {
            reader,
            options,
            cancel,
            display: Arc::new(Mutex::new(display)),
            invalidated: false,
        }
    }

    /// Handle the host can use to abort the read from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    fn emit(&self, message: &DisplayMessage) -> String {
        let mut display = self.display.lock().expect("display callback poisoned");
        (*display)(message).unwrap_or_else(|| message.default_text())
    }

    /// Run the full reading sequence. Always invalidates the chip session
    /// before returning, with a message matching the outcome.
    pub fn read_document(&mut self, mrz_key: &str) -> Result<DocumentResult> {
        let mut rng = thread_rng();
        let outcome = self.run(mrz_key, &mut rng);
        match &outcome {
            Ok(_) => {
                let message = self.emit(&DisplayMessage::SuccessfulRead);
                self.invalidate(Some(&message));
            }
            Err(err) => {
                let message = self.emit(&DisplayMessage::Error(err.user_message()));
                self.invalidate(Some(&message));
            }
        }
        outcome
    }

    fn invalidate(&mut self, message: Option<&str>) {
        // Invalidation is idempotent; the flag also suppresses the
        // transport-level "user canceled" that teardown can trigger.
        if !self.invalidated {
            self.invalidated = true;
            self.reader.invalidate(message);
        }
    }

    fn run(&mut self, mrz_key: &str, rng: &mut dyn CryptoCoreRng) -> Result<DocumentResult> {
        let mut result = DocumentResult::default();
        self.emit(&DisplayMessage::RequestPresent);
        self.reader.transport_mut().connect()?;
        self.emit(&DisplayMessage::Authenticating(0));

        // EF.CardAccess is read in the clear; its presence with a well
        // formed PACEInfo is the PACE precondition.
        let card_access = match self.reader.read_card_access() {
            Ok(raw) => match <SecurityInfos as der::Decode>::from_der(&raw) {
                Ok(infos) => Some(infos),
                Err(err) => {
                    warn!(%err, "EF.CardAccess unparseable");
                    None
                }
            },
            Err(Error::UserCanceled) => return Err(Error::UserCanceled),
            Err(err) => {
                debug!(%err, "EF.CardAccess not available");
                None
            }
        };
        result.card_access = card_access.clone();

        // Access control: PACE with BAC fallback.
        let mut paced = false;
        let mut cam_data = None;
        if !self.options.skip_pace {
            if let Some(card_access) = &card_access {
                match pace::establish(&mut self.reader, mrz_key, card_access, rng) {
                    Ok(outcome) => {
                        result.pace_status = AuthStatus::Success;
                        paced = true;
                        cam_data = outcome.cam;
                    }
                    Err(Error::UserCanceled) => return Err(Error::UserCanceled),
                    Err(err) => {
                        warn!(%err, "PACE failed, downgrading to BAC");
                        result.pace_status = AuthStatus::Failed;
                        self.reader.clear_secure_messaging();
                    }
                }
            }
        }
        self.emit(&DisplayMessage::Authenticating(40));

        self.reader.select_application(AID_EMRTD).map_err(|err| match err {
            Error::UserCanceled | Error::Timeout => err,
            _ => Error::Connection,
        })?;

        if !paced {
            // BAC failure is terminal.
            bac::establish(&mut self.reader, mrz_key, &mut thread_rng())?;
            result.bac_status = AuthStatus::Success;
        }
        self.emit(&DisplayMessage::Authenticating(100));

        // EF.COM first; it drives data group discovery.
        let com = self.read_data_group(DataGroupId::Com)?;
        let com_list = match &com.content {
            DataGroupContent::Com(com) => com.data_groups(),
            _ => Vec::new(),
        };
        result.data_groups.insert(DataGroupId::Com, com);

        // Effective list: explicit caller list wins, COM and SOD always
        // included, secure elements filtered unless opted in.
        let mut wanted: BTreeSet<DataGroupId> = if self.options.data_groups.is_empty() {
            com_list.into_iter().collect()
        } else {
            self.options.data_groups.clone()
        };
        wanted.insert(DataGroupId::Sod);
        if self.options.skip_secure_elements() {
            wanted.retain(|id| !id.is_secure_element());
        }
        wanted.remove(&DataGroupId::Com);

        // EF.SOD before any DG.
        wanted.remove(&DataGroupId::Sod);
        let sod = self.read_data_group(DataGroupId::Sod)?;
        if let DataGroupContent::Sod(parsed) = &sod.content {
            result.document_hash = parsed.document_hash().ok();
        }
        result.data_groups.insert(DataGroupId::Sod, sod);

        // Chip Authentication upgrades the session before the bulk reads.
        if wanted.contains(&DataGroupId::Dg14) {
            wanted.remove(&DataGroupId::Dg14);
            self.read_with_retries(DataGroupId::Dg14, mrz_key, &mut result)?;
            if let Some(dg14) = result.dg14_infos() {
                // PACE-CAM already authenticated the chip against its static
                // key; verify the revealed ratio now that DG14 is readable.
                if let Some(cam) = cam_data.take() {
                    match verify_cam(&cam, &dg14) {
                        Ok(()) => result.chip_authentication_status = AuthStatus::Success,
                        Err(err) => {
                            warn!(%err, "PACE-CAM verification failed");
                            result.chip_authentication_status = AuthStatus::Failed;
                            result.verification_errors.push(err.to_string());
                        }
                    }
                }
                if !self.options.skip_chip_authentication
                    && result.chip_authentication_status != AuthStatus::Success
                {
                    match chip_authentication::execute(&mut self.reader, &dg14, rng) {
                        Ok(_) => result.chip_authentication_status = AuthStatus::Success,
                        Err(Error::UserCanceled) => return Err(Error::UserCanceled),
                        Err(err) => {
                            warn!(%err, "Chip Authentication failed, re-establishing BAC");
                            result.chip_authentication_status = AuthStatus::Failed;
                            self.reestablish(mrz_key, &mut result, paced)?;
                        }
                    }
                }
            }
        }

        // Remaining data groups in numeric order.
        for id in wanted.clone() {
            self.read_with_retries(id, mrz_key, &mut result)?;
        }

        // Active Authentication needs the DG15 key.
        if let Some(dg) = result.data_groups.get(&DataGroupId::Dg15) {
            if let DataGroupContent::ActiveAuthenticationKey(dg15) = &dg.content {
                let dg15 = dg15.clone();
                let aa_info = result
                    .dg14_infos()
                    .and_then(|infos| infos.active_authentication());
                match active_authentication::execute(
                    &mut self.reader,
                    &dg15,
                    aa_info.as_ref(),
                    rng,
                ) {
                    Ok(()) => result.active_authentication_status = AuthStatus::Success,
                    Err(Error::UserCanceled) => return Err(Error::UserCanceled),
                    Err(err) => {
                        warn!(%err, "Active Authentication failed");
                        result.active_authentication_status = AuthStatus::Failed;
                    }
                }
            }
        }

        // Passive Authentication: failure is surfaced, never fatal.
        if let Some(sod) = result.sod() {
            let report = passive::verify_document(
                sod,
                &result.data_groups,
                self.options.master_list.as_deref(),
            );
            result.passive_authentication_status = if report.all_ok() {
                AuthStatus::Success
            } else {
                AuthStatus::Failed
            };
            result.document_signer_certificate = report.document_signer.clone();
            result.verification_errors.extend(report.errors);
        } else {
            result.passive_authentication_status = AuthStatus::Failed;
            result
                .verification_errors
                .push("EF.SOD unavailable, passive authentication skipped".into());
        }

        info!(
            data_groups = result.data_groups.len(),
            passive = ?result.passive_authentication_status,
            "document read complete"
        );
        Ok(result)
    }

    /// One data group read with failure classification: recover the channel
    /// where possible, at most two attempts total.
    fn read_with_retries(
        &mut self,
        id: DataGroupId,
        mrz_key: &str,
        result: &mut DocumentResult,
    ) -> Result<()> {
        let explicit = self.options.data_groups.contains(&id);
        match self.try_read(id, mrz_key, result, true) {
            Ok(Some(dg)) => {
                result.data_groups.insert(id, dg);
                Ok(())
            }
            Ok(None) => Ok(()), // dropped (access denied)
            Err(err) if explicit => Err(err),
            Err(err) => {
                warn!(%id, %err, "abandoning data group after retries");
                result
                    .verification_errors
                    .push(format!("{id}: read failed: {err}"));
                Ok(())
            }
        }
    }

    fn try_read(
        &mut self,
        id: DataGroupId,
        mrz_key: &str,
        result: &mut DocumentResult,
        may_retry: bool,
    ) -> Result<Option<DataGroup>> {
        match self.read_data_group(id) {
            Ok(dg) => Ok(Some(dg)),
            Err(Error::UserCanceled) => Err(Error::UserCanceled),
            Err(err) if !may_retry => Err(err),
            Err(err) if err.indicates_access_denied() => {
                // Drop the DG and recover the channel; no retry.
                debug!(%id, "access denied, dropping data group");
                self.reestablish(mrz_key, result, false)?;
                Ok(None)
            }
            Err(err) if err.indicates_broken_channel() || matches!(err, Error::Connection) => {
                debug!(%id, %err, "channel broken, re-establishing before retry");
                self.reestablish(mrz_key, result, false)?;
                self.try_read(id, mrz_key, result, false)
            }
            Err(err) if err.indicates_wrong_length() => {
                let halved = self.reader.read_amount() / 2;
                self.reader.set_read_amount(halved.max(1));
                debug!(%id, halved, "wrong length, shrinking chunk before retry");
                self.try_read(id, mrz_key, result, false)
            }
            Err(err) => {
                debug!(%id, %err, "read failed, retrying once verbatim");
                self.try_read(id, mrz_key, result, false)
            }
        }
    }

    /// Re-run access control after a broken or downgraded channel.
    fn reestablish(
        &mut self,
        mrz_key: &str,
        result: &mut DocumentResult,
        after_pace: bool,
    ) -> Result<()> {
        self.reader.clear_secure_messaging();
        self.reader.transport_mut().connect()?;
        self.reader
            .select_application(AID_EMRTD)
            .map_err(|_| Error::Connection)?;
        bac::establish(&mut self.reader, mrz_key, &mut thread_rng())?;
        // PACE remains the recorded access method when it opened the
        // session; BAC here is channel recovery only.
        if !after_pace && result.pace_status != AuthStatus::Success {
            result.bac_status = AuthStatus::Success;
        }
        Ok(())
    }

    fn read_data_group(&mut self, id: DataGroupId) -> Result<DataGroup> {
        self.emit(&DisplayMessage::ReadingDataGroup(id, 0));
        let display = Arc::clone(&self.display);
        self.reader.progress = Some(Box::new(move |pct| {
            let mut display = display.lock().expect("display callback poisoned");
            (*display)(&DisplayMessage::ReadingDataGroup(id, pct));
        }));
        let raw = self.reader.read_binary_by_sfi(id.short_ef());
        self.reader.progress = None;
        let raw = raw?;
        DataGroup::parse(id, raw)
    }
}

/// PACE-CAM: verify `PK.map == [CA] PK.IC` against the DG14 static key.
/// See ICAO 9303-11 section 4.4.3.5.
fn verify_cam(cam: &pace::CamData, dg14: &SecurityInfos) -> Result<()> {
    let (_, pk_info) = dg14
        .chip_authentication()
        .ok_or(Error::ChipAuthentication)?;
    let (curve, static_pk) = pk_info.chip_authentication_public_key.ec_key()?;
    if curve != cam.curve {
        return Err(Error::ChipAuthentication);
    }
    let ca_scalar = crate::crypto::FieldUint::try_from_be_slice(&cam.ca_ic)
        .ok_or(Error::ChipAuthentication)?;
    let expected = curve.mul(static_pk, ca_scalar)?;
    if expected == cam.chip_mapping_pk {
        Ok(())
    } else {
        Err(Error::ChipAuthentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_cells() {
        assert_eq!(progress_bar(0), "⚪️ ⚪️ ⚪️ ⚪️ ⚪️ ");
        assert_eq!(progress_bar(39), "🔵 ⚪️ ⚪️ ⚪️ ⚪️ ");
        assert_eq!(progress_bar(100), "🔵 🔵 🔵 🔵 🔵 ");
    }

    #[test]
    fn test_display_defaults() {
        assert_eq!(
            DisplayMessage::SuccessfulRead.default_text(),
            "NFC read successfully"
        );
        assert!(DisplayMessage::ReadingDataGroup(DataGroupId::Dg2, 60)
            .default_text()
            .starts_with("Reading DG2.....\n\n"));
    }

    #[test]
    fn test_auth_status_default() {
        assert_eq!(AuthStatus::default(), AuthStatus::NotDone);
    }
}
