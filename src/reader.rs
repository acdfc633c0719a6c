//! High-level file and authentication operations over a transport, with
//! secure messaging layered in once a handshake has installed session keys.

use {
    crate::{
        ensure_err,
        iso7816::{Apdu, Response, StatusWord},
        lds::tlv,
        secure_messaging::{PlainText, SecureMessaging},
        transport::Transport,
        Error, Result,
    },
    std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    tracing::{debug, trace, warn},
};

/// The eMRTD application identifier. See ICAO 9303-10 3.6.1.
pub const AID_EMRTD: &[u8] = &[0xA0, 0x00, 0x00, 0x02, 0x47, 0x10, 0x01];

/// Short EF identifier of EF.CardAccess in the master file.
pub const SFI_CARD_ACCESS: u8 = 0x1C;

/// Default Le for chunked binary reads; can be lowered for flaky chips.
pub const DEFAULT_READ_AMOUNT: usize = 0xA0;

const MIN_READ_AMOUNT: usize = 0x01;

/// Cooperative cancellation handle shared with the host.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-file progress callback, invoked with 0..=100.
pub type ProgressFn = Box<dyn FnMut(u8) + Send>;

pub struct TagReader<T: Transport> {
    transport:   T,
    sm:          Box<dyn SecureMessaging + Send>,
    read_amount: usize,
    cancel:      CancelFlag,
    pub progress: Option<ProgressFn>,
}

impl<T: Transport> TagReader<T> {
    pub fn new(transport: T, cancel: CancelFlag) -> Self {
        Self {
            transport,
            sm: Box::new(PlainText),
            read_amount: DEFAULT_READ_AMOUNT,
            cancel,
            progress: None,
        }
    }

    /// Install session keys; replaces any previous secure messaging state.
    pub fn set_secure_messaging(&mut self, sm: Box<dyn SecureMessaging + Send>) {
        self.sm = sm;
    }

    /// Drop back to plaintext, e.g. before re-running BAC.
    pub fn clear_secure_messaging(&mut self) {
        self.sm = Box::new(PlainText);
    }

    pub fn secure_messaging_ssc(&self) -> u128 {
        self.sm.ssc()
    }

    /// Lower the chunk size used by binary reads. Clamped to `[0x01, 0x100]`.
    pub fn set_read_amount(&mut self, amount: usize) {
        self.read_amount = amount.clamp(MIN_READ_AMOUNT, 0x100);
    }

    pub const fn read_amount(&self) -> usize {
        self.read_amount
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn report_progress(&mut self, pct: u8) {
        if let Some(progress) = &mut self.progress {
            progress(pct.min(100));
        }
    }

    /// One wrapped exchange. `0x61xx` continuation is handled here.
    pub fn send(&mut self, apdu: &Apdu) -> Result<Response> {
        ensure_err!(!self.cancel.is_canceled(), Error::UserCanceled);
        let wire = self.sm.enc_apdu(apdu)?;
        trace!(tx = %hex::encode(&wire));
        let raw = self.transport.transceive(&wire)?;
        trace!(rx = %hex::encode(&raw));
        let outer = Response::from_bytes(&raw)?;

        // A chip that lost the SM context answers with a bare status word.
        let mut response = if outer.data.is_empty() && !outer.status.is_success() {
            outer
        } else {
            self.sm.dec_response(outer.status, &outer.data)?
        };

        while let Some(remaining) = response.status.data_remaining() {
            debug!(remaining, "GET RESPONSE continuation");
            let get_response = Apdu::new(0x00, 0xC0, 0x00, 0x00).with_le(remaining);
            let wire = self.sm.enc_apdu(&get_response)?;
            let raw = self.transport.transceive(&wire)?;
            let outer = Response::from_bytes(&raw)?;
            let chunk = self.sm.dec_response(outer.status, &outer.data)?;
            response.data.extend_from_slice(&chunk.data);
            response.status = chunk.status;
        }
        Ok(response)
    }

    fn send_checked(&mut self, apdu: &Apdu) -> Result<Vec<u8>> {
        self.send(apdu)?.into_checked()
    }

    /// Select the master file.
    /// See ISO 7816-4 section 11.2.2.
    pub fn select_master_file(&mut self) -> Result<()> {
        let apdu = Apdu::new(0x00, 0xA4, 0x00, 0x0C).with_data([0x3F, 0x00]);
        self.send_checked(&apdu).map(drop)
    }

    /// Select an application by AID.
    pub fn select_application(&mut self, aid: &[u8]) -> Result<()> {
        ensure_err!(aid.len() <= 16, Error::Unexpected("AID too long".into()));
        let apdu = Apdu::new(0x00, 0xA4, 0x04, 0x0C).with_data(aid);
        self.send_checked(&apdu).map(drop)
    }

    /// Select an elementary file under the current DF.
    /// See ICAO 9303-10 section 3.6.2.
    pub fn select_file(&mut self, file_id: u16) -> Result<()> {
        let apdu = Apdu::new(0x00, 0xA4, 0x02, 0x0C).with_data(file_id.to_be_bytes());
        self.send_checked(&apdu).map(drop)
    }

    /// Random nonce for BAC.
    /// See ICAO 9303-11 section 4.3.4.1.
    pub fn get_challenge(&mut self) -> Result<[u8; 8]> {
        let apdu = Apdu::new(0x00, 0x84, 0x00, 0x00).with_le(8);
        let data = self.send_checked(&apdu)?;
        data.try_into()
            .map_err(|_| Error::Parse("challenge is not 8 bytes".into()))
    }

    /// BAC mutual authentication exchange.
    pub fn external_authenticate(&mut self, cryptogram: &[u8]) -> Result<Vec<u8>> {
        let apdu = Apdu::new(0x00, 0x82, 0x00, 0x00)
            .with_data(cryptogram)
            .with_le(0x28);
        self.send(&apdu)?.into_checked()
    }

    /// Active Authentication challenge-response.
    /// See ICAO 9303-11 section 6.1.
    pub fn internal_authenticate(&mut self, challenge: &[u8]) -> Result<Vec<u8>> {
        let apdu = Apdu::new(0x00, 0x88, 0x00, 0x00)
            .with_data(challenge)
            .with_le(0x100);
        self.send_checked(&apdu)
    }

    /// MSE:SET AT, selecting an authentication protocol.
    pub fn mse_set_at(&mut self, p1: u8, p2: u8, data: Vec<u8>) -> Result<()> {
        let apdu = Apdu::new(0x00, 0x22, p1, p2).with_data(data);
        let data = self.send_checked(&apdu)?;
        ensure_err!(
            data.is_empty(),
            Error::Unexpected("MSE:SET returned data".into())
        );
        Ok(())
    }

    /// GENERAL AUTHENTICATE step carrying a dynamic authentication data
    /// object; `last` clears the command-chaining class bit.
    pub fn general_authenticate(&mut self, inner: Vec<u8>, last: bool) -> Result<Vec<u8>> {
        let cla = if last { 0x00 } else { 0x10 };
        let mut data = vec![0x7C];
        data.extend_from_slice(&crate::secure_messaging::ber_length(inner.len()));
        data.extend_from_slice(&inner);
        let apdu = Apdu::new(cla, 0x86, 0x00, 0x00).with_data(data).with_le(0x100);
        let resp = self.send_checked(&apdu)?;

        // Strip the 7C wrapper from the response.
        let tlv = tlv::Tlv::decode(&resp)?;
        ensure_err!(
            tlv.tag == 0x7C,
            Error::Parse("expected dynamic authentication data".into())
        );
        Ok(match &tlv.value {
            tlv::TlvValue::Constructed(children) => {
                children.iter().flat_map(tlv::Tlv::encode).collect()
            }
            tlv::TlvValue::Primitive(bytes) => bytes.clone(),
        })
    }

    /// EF.CardAccess, read in the clear from the master file.
    pub fn read_card_access(&mut self) -> Result<Vec<u8>> {
        self.read_binary_by_sfi(SFI_CARD_ACCESS)
    }

    /// Chunked READ BINARY with short-EF addressing and progress reporting.
    ///
    /// The first chunk addresses the file by short identifier, which also
    /// selects it; the outer TLV header of that chunk gives the total length
    /// and the rest is read by offset. See ICAO 9303-10 3.6.3.2.
    pub fn read_binary_by_sfi(&mut self, sfi: u8) -> Result<Vec<u8>> {
        ensure_err!(sfi <= 0x1F, Error::Unexpected("bad short EF id".into()));
        self.report_progress(0);

        let first_le = self.read_amount;
        let first = self.read_chunk(0x80 | sfi, 0x00, first_le)?;
        self.assemble_file(first)
    }

    /// As [`read_binary_by_sfi`], for a file already selected with
    /// [`select_file`].
    pub fn read_binary_selected(&mut self) -> Result<Vec<u8>> {
        self.report_progress(0);
        let first_le = self.read_amount;
        let first = self.read_chunk(0x00, 0x00, first_le)?;
        self.assemble_file(first)
    }

    fn assemble_file(&mut self, first: Vec<u8>) -> Result<Vec<u8>> {
        let (header_len, body_len) = tlv::peek_length(&first)
            .map_err(|_| Error::Parse("file does not start with a TLV header".into()))?;
        let total = header_len + body_len;
        let mut file = first;
        file.truncate(total);

        while file.len() < total {
            let remaining = total - file.len();
            let le = remaining.min(self.read_amount);
            let offset = file.len() as u16;
            let chunk = self.read_chunk((offset >> 8) as u8, (offset & 0xFF) as u8, le)?;
            ensure_err!(
                !chunk.is_empty(),
                Error::Parse("chip returned empty chunk".into())
            );
            file.extend_from_slice(&chunk);
            let pct = (file.len() * 100 / total) as u8;
            self.report_progress(pct);
        }
        self.report_progress(100);
        Ok(file)
    }

    /// One READ BINARY exchange with the wrong-length retry policy: a first
    /// `6Cxx` is retried with the suggested Le, a second one (or `6700`)
    /// halves the chunk size for the rest of the session.
    fn read_chunk(&mut self, p1: u8, p2: u8, le: usize) -> Result<Vec<u8>> {
        let mut le = le;
        let mut corrected = false;
        loop {
            let apdu = Apdu::new(0x00, 0xB0, p1, p2).with_le(le);
            let response = self.send(&apdu)?;
            if let Some(suggested) = response.status.wrong_le() {
                if corrected {
                    self.shrink_read_amount();
                    le = le.min(self.read_amount);
                    warn!(le, "repeated wrong length, shrinking chunk size");
                } else {
                    corrected = true;
                    le = suggested;
                }
                continue;
            }
            if response.status == StatusWord::WRONG_LENGTH {
                ensure_err!(
                    self.read_amount > MIN_READ_AMOUNT,
                    Error::Response(response.status)
                );
                self.shrink_read_amount();
                le = le.min(self.read_amount);
                continue;
            }
            return response.into_checked();
        }
    }

    fn shrink_read_amount(&mut self) {
        self.read_amount = (self.read_amount / 2).max(MIN_READ_AMOUNT);
    }

    /// Tear down the transport session. Safe to call repeatedly.
    pub fn invalidate(&mut self, message: Option<&str>) {
        self.transport.invalidate(message);
    }
}
