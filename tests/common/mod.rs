//! A software chip speaking the plaintext and secure-messaging halves of the
//! ICAO 9303 protocol, driven through the [`Transport`] trait. Enough of the
//! card side is implemented to exercise BAC, chunked reads and the session
//! orchestrator's retry policy.
#![allow(dead_code)]

use {
    emrtd_reader::{
        crypto::seed_from_mrz,
        lds::DataGroupId,
        secure_messaging::{
            pad,
            tdes::{dec_3des, derive_keys, enc_3des, retail_mac},
            unpad,
        },
        Transport, TransportError,
    },
    std::collections::{BTreeMap, BTreeSet},
};

pub const DOC_MRZ_KEY: &str = "L898902C<369080619406236";

/// Chip-side secure messaging context.
struct ChipSm {
    ksenc: [u8; 16],
    ksmac: [u8; 16],
    ssc:   u64,
}

pub struct MockChip {
    files:         BTreeMap<u8, Vec<u8>>,
    denied:        BTreeSet<u8>,
    mrz_key:       String,
    rnd_ic:        [u8; 8],
    k_ic:          [u8; 16],
    sm:            Option<ChipSm>,
    selected:      Option<u8>,
    app_selected:  bool,
    /// Largest Le honoured before answering `6Cxx`.
    pub max_le:    usize,
    /// Fail every exchange from this count onward (simulates tag loss).
    pub fail_after: Option<usize>,
    pub exchanges: usize,
    pub bac_runs:  usize,
    pub invalidations: usize,
    pub last_message: Option<String>,
    /// Short EF ids in first-chunk read order.
    pub read_log:  Vec<u8>,
}

impl MockChip {
    pub fn new() -> Self {
        Self {
            files:         BTreeMap::new(),
            denied:        BTreeSet::new(),
            mrz_key:       DOC_MRZ_KEY.to_string(),
            rnd_ic:        [0x46, 0x08, 0xF9, 0x19, 0x88, 0x70, 0x22, 0x12],
            k_ic:          [0x0B; 16],
            sm:            None,
            selected:      None,
            app_selected:  false,
            max_le:        0x100,
            fail_after:    None,
            exchanges:     0,
            bac_runs:      0,
            invalidations: 0,
            last_message:  None,
            read_log:      Vec::new(),
        }
    }

    pub fn with_file(mut self, id: DataGroupId, content: Vec<u8>) -> Self {
        self.files.insert(id.short_ef(), content);
        self
    }

    pub fn deny(mut self, id: DataGroupId) -> Self {
        self.denied.insert(id.short_ef());
        self
    }

    fn fid_to_sfi(fid: u16) -> Option<u8> {
        match fid {
            0x3F00 => None,
            fid if fid & 0xFF00 == 0x0100 => Some((fid & 0x1F) as u8),
            _ => None,
        }
    }

    fn respond(data: &[u8], sw: u16) -> Vec<u8> {
        let mut out = data.to_vec();
        out.extend_from_slice(&sw.to_be_bytes());
        out
    }

    /// Process one plaintext APDU.
    fn process_plain(&mut self, apdu: &[u8]) -> (Vec<u8>, u16) {
        if apdu.len() < 4 {
            return (Vec::new(), 0x6700);
        }
        let (ins, p1, p2) = (apdu[1], apdu[2], apdu[3]);
        match ins {
            // SELECT
            0xA4 => {
                let data = command_data(apdu);
                match p1 {
                    0x04 => {
                        self.app_selected = true;
                        (Vec::new(), 0x9000)
                    }
                    0x02 => {
                        let fid = u16::from_be_bytes([data[0], data[1]]);
                        match Self::fid_to_sfi(fid) {
                            Some(sfi) if self.files.contains_key(&sfi) => {
                                self.selected = Some(sfi);
                                (Vec::new(), 0x9000)
                            }
                            _ => (Vec::new(), 0x6A82),
                        }
                    }
                    _ => (Vec::new(), 0x9000),
                }
            }
            // GET CHALLENGE
            0x84 => (self.rnd_ic.to_vec(), 0x9000),
            // EXTERNAL AUTHENTICATE (BAC)
            0x82 => self.external_authenticate(command_data(apdu)),
            // READ BINARY
            0xB0 => self.read_binary(p1, p2, le_of(apdu)),
            _ => (Vec::new(), 0x6D00),
        }
    }

    fn external_authenticate(&mut self, data: &[u8]) -> (Vec<u8>, u16) {
        let (kenc, kmac) = derive_keys(&seed_from_mrz(&self.mrz_key));
        if data.len() != 40 {
            return (Vec::new(), 0x6700);
        }
        let (e, m) = data.split_at(32);
        let mut padded = e.to_vec();
        pad(&mut padded, 8);
        if retail_mac(&kmac, &padded).as_slice() != m {
            return (Vec::new(), 0x6300);
        }
        let plain = dec_3des(&kenc, e);
        let (rnd_ifd, rest) = plain.split_at(8);
        let (rnd_ic, k_ifd) = rest.split_at(8);
        if rnd_ic != self.rnd_ic.as_slice() {
            return (Vec::new(), 0x6300);
        }

        // Response cryptogram: RND.IC || RND.IFD || K.IC
        let mut s = Vec::new();
        s.extend_from_slice(&self.rnd_ic);
        s.extend_from_slice(rnd_ifd);
        s.extend_from_slice(&self.k_ic);
        let e_ic = enc_3des(&kenc, &s);
        let mut padded = e_ic.clone();
        pad(&mut padded, 8);
        let m_ic = retail_mac(&kmac, &padded);
        let mut response = e_ic;
        response.extend_from_slice(&m_ic);

        // Install the session.
        let mut k_seed = [0u8; 16];
        for (out, (a, b)) in k_seed.iter_mut().zip(k_ifd.iter().zip(self.k_ic.iter())) {
            *out = a ^ b;
        }
        let (ksenc, ksmac) = derive_keys(&k_seed);
        let mut ssc = [0u8; 8];
        ssc[..4].copy_from_slice(&self.rnd_ic[4..]);
        ssc[4..].copy_from_slice(&rnd_ifd[4..]);
        self.sm = Some(ChipSm {
            ksenc,
            ksmac,
            ssc: u64::from_be_bytes(ssc),
        });
        self.bac_runs += 1;
        (response, 0x9000)
    }

    fn read_binary(&mut self, p1: u8, p2: u8, le: usize) -> (Vec<u8>, u16) {
        let (sfi, offset, first) = if p1 & 0x80 != 0 {
            (p1 & 0x1F, p2 as usize, true)
        } else {
            match self.selected {
                Some(sfi) => (sfi, u16::from_be_bytes([p1, p2]) as usize, false),
                None => return (Vec::new(), 0x6986),
            }
        };
        if self.denied.contains(&sfi) {
            return (Vec::new(), 0x6982);
        }
        if !self.files.contains_key(&sfi) {
            return (Vec::new(), 0x6A82);
        }
        if first {
            self.read_log.push(sfi);
        }
        self.selected = Some(sfi);
        let file = &self.files[&sfi];
        if le > self.max_le {
            let suggest = self.max_le.min(0xFF) as u16;
            return (Vec::new(), 0x6C00 | suggest);
        }
        if offset >= file.len() {
            return (Vec::new(), 0x6282);
        }
        let end = (offset + le).min(file.len());
        let chunk = file[offset..end].to_vec();
        let sw = if end - offset < le { 0x6282 } else { 0x9000 };
        (chunk, sw)
    }

    /// Chip-side unwrap, execute, wrap.
    fn process_wrapped(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError> {
        let Some(mut sm) = self.sm.take() else {
            return Ok(Self::respond(&[], 0x6987));
        };
        sm.ssc = sm.ssc.wrapping_add(1);

        let header = &apdu[..4];
        let data = command_data(apdu);
        let dos = split_dos(data);
        let do87 = dos.iter().find(|(t, _)| *t == 0x87);
        let do97 = dos.iter().find(|(t, _)| *t == 0x97);
        let do8e = dos.iter().find(|(t, _)| *t == 0x8E);

        // Verify the command MAC.
        let mut mac_input = sm.ssc.to_be_bytes().to_vec();
        let mut padded_header = header.to_vec();
        pad(&mut padded_header, 8);
        mac_input.extend_from_slice(&padded_header);
        if let Some((_, raw)) = do87 {
            mac_input.extend_from_slice(raw);
        }
        if let Some((_, raw)) = do97 {
            mac_input.extend_from_slice(raw);
        }
        pad(&mut mac_input, 8);
        let expected = retail_mac(&sm.ksmac, &mac_input);
        let presented = do8e.map(|(_, raw)| &raw[raw.len() - 8..]);
        if presented != Some(&expected[..]) {
            self.sm = None;
            return Ok(Self::respond(&[], 0x6988));
        }

        // Decrypt the command data and rebuild a plain APDU.
        let plain_data = match do87 {
            Some((_, raw)) => {
                let value = do_value(raw);
                let plain = dec_3des(&sm.ksenc, &value[1..]);
                unpad(&plain).expect("chip received bad padding").to_vec()
            }
            None => Vec::new(),
        };
        let le = do97
            .map(|(_, raw)| {
                let value = do_value(raw);
                if value[0] == 0 && value.len() == 1 {
                    0x100
                } else {
                    value[0] as usize
                }
            })
            .unwrap_or(0);

        let mut plain_apdu = vec![header[0] & !0x0C, header[1], header[2], header[3]];
        if !plain_data.is_empty() {
            plain_apdu.push(plain_data.len() as u8);
            plain_apdu.extend_from_slice(&plain_data);
        }
        plain_apdu.push(le as u8);
        let (resp_data, sw) = self.process_plain(&plain_apdu);

        // Wrap the response.
        sm.ssc = sm.ssc.wrapping_add(1);
        let mut body = Vec::new();
        if !resp_data.is_empty() {
            let mut plain = resp_data;
            pad(&mut plain, 8);
            let ct = enc_3des(&sm.ksenc, &plain);
            body.push(0x87);
            if ct.len() + 1 > 0x7F {
                body.push(0x81);
            }
            body.push((ct.len() + 1) as u8);
            body.push(0x01);
            body.extend_from_slice(&ct);
        }
        body.push(0x99);
        body.push(0x02);
        body.extend_from_slice(&sw.to_be_bytes());

        let mut mac_input = sm.ssc.to_be_bytes().to_vec();
        mac_input.extend_from_slice(&body);
        pad(&mut mac_input, 8);
        let mac = retail_mac(&sm.ksmac, &mac_input);
        body.push(0x8E);
        body.push(0x08);
        body.extend_from_slice(&mac);

        self.sm = Some(sm);
        Ok(Self::respond(&body, 0x9000))
    }
}

impl Transport for MockChip {
    fn connect(&mut self) -> Result<(), TransportError> {
        if let Some(limit) = self.fail_after {
            if self.exchanges >= limit {
                return Err(TransportError::TagLost);
            }
        }
        Ok(())
    }

    fn transceive(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.exchanges += 1;
        if let Some(limit) = self.fail_after {
            if self.exchanges > limit {
                return Err(TransportError::TagLost);
            }
        }
        if apdu[0] & 0x0C == 0x0C {
            self.process_wrapped(apdu)
        } else {
            // A plain command tears down any secure messaging context.
            self.sm = None;
            let (data, sw) = self.process_plain(apdu);
            Ok(Self::respond(&data, sw))
        }
    }

    fn invalidate(&mut self, message: Option<&str>) {
        self.invalidations += 1;
        self.last_message = message.map(str::to_string);
    }
}

/// Shared handle so tests can inspect the chip after the session consumed
/// the transport.
#[derive(Clone)]
pub struct SharedChip(pub std::rc::Rc<std::cell::RefCell<MockChip>>);

impl SharedChip {
    pub fn new(chip: MockChip) -> Self {
        Self(std::rc::Rc::new(std::cell::RefCell::new(chip)))
    }
}

impl Transport for SharedChip {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.0.borrow_mut().connect()
    }

    fn transceive(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.0.borrow_mut().transceive(apdu)
    }

    fn invalidate(&mut self, message: Option<&str>) {
        self.0.borrow_mut().invalidate(message);
    }
}

fn command_data(apdu: &[u8]) -> &[u8] {
    if apdu.len() <= 5 {
        return &[];
    }
    let lc = apdu[4] as usize;
    &apdu[5..(5 + lc).min(apdu.len())]
}

fn le_of(apdu: &[u8]) -> usize {
    if apdu.len() == 5 {
        let le = apdu[4] as usize;
        if le == 0 {
            0x100
        } else {
            le
        }
    } else if apdu.len() > 5 {
        let lc = apdu[4] as usize;
        if apdu.len() == 5 + lc {
            0
        } else {
            let le = apdu[apdu.len() - 1] as usize;
            if le == 0 {
                0x100
            } else {
                le
            }
        }
    } else {
        0
    }
}

fn do_value(raw: &[u8]) -> &[u8] {
    match raw[1] {
        0x81 => &raw[3..],
        0x82 => &raw[4..],
        _ => &raw[2..],
    }
}

fn split_dos(mut data: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut out = Vec::new();
    while data.len() >= 2 {
        let tag = data[0];
        let (len, header) = match data[1] {
            0x81 => (data[2] as usize, 3),
            0x82 => (u16::from_be_bytes([data[2], data[3]]) as usize, 4),
            n => (n as usize, 2),
        };
        let total = header + len;
        out.push((tag, data[..total].to_vec()));
        data = &data[total..];
    }
    out
}
