mod common;

use common::{with_master, Peer, SimBus, Wire};
use nixie_i2c_master::devices::{nixie, oled, power, rtc};
use nixie_i2c_master::Engine;

#[test]
fn rtc_read_sets_pointer_first() {
    let time = [0x30, 0x59, 0x40 | 0x23, 0x06, 0x31, 0x12, 0x26];
    let engine = Engine::new(SimBus::new(vec![Peer::responding(rtc::ADDRESS, &time)]));

    let registers = with_master(&engine, |master| rtc::read_registers(master)).unwrap();

    assert_eq!(registers.0, time);
    assert_eq!(registers.hours(), 0x23);
    assert_eq!(engine.bus().peer(rtc::ADDRESS).received, [0x00]);
}

#[test]
fn rtc_write_sends_pointer_then_registers() {
    let engine = Engine::new(SimBus::new(vec![Peer::new(rtc::ADDRESS)]));
    let registers = rtc::Registers([0x00, 0x15, 0x40 | 0x08, 0x01, 0x18, 0x10, 0x26]);

    with_master(&engine, |master| rtc::write_registers(master, &registers)).unwrap();

    assert_eq!(
        engine.bus().peer(rtc::ADDRESS).received,
        [0x00, 0x00, 0x15, 0x48, 0x01, 0x18, 0x10, 0x26]
    );
}

#[test]
fn oled_init_clears_whole_memory_in_one_transaction() {
    let engine = Engine::new(SimBus::new(vec![Peer::new(oled::ADDRESS)]));

    with_master(&engine, |master| oled::init(master)).unwrap();

    let received = engine.bus().peer(oled::ADDRESS).received;
    let fill = &received[received.len() - (oled::MEMORY_SIZE + 1)..];
    assert_eq!(fill[0], oled::DATA);
    assert!(fill[1..].iter().all(|&b| b == 0));

    let stops = engine
        .bus()
        .log()
        .iter()
        .filter(|wire| **wire == Wire::Stop)
        .count();
    // init sequence, bounds, fill
    assert_eq!(stops, 3);
    assert_eq!(engine.error_count(), 0);
}

#[test]
fn oled_missing_reports_address_nack() {
    let engine = Engine::new(SimBus::new(vec![]));

    let err = with_master(&engine, |master| oled::set_inverted(master, true)).unwrap_err();

    assert_eq!(err.reason, nixie_i2c_master::Reason::AddressNack);
    assert_eq!(engine.error_count(), 1);
}

#[test]
fn power_status_and_capabilities() {
    let pdo_5v: u32 = (3_000 / 10) | ((5_000 / 50) << 10);
    let pdo_20v: u32 = (2_250 / 10) | ((20_000 / 50) << 10);

    let mut respond = vec![0x01, 0x02];
    respond.extend_from_slice(&pdo_5v.to_le_bytes());
    respond.extend_from_slice(&pdo_20v.to_le_bytes());
    let engine = Engine::new(SimBus::new(vec![Peer::responding(power::ADDRESS, &respond)]));

    let (status, caps) = with_master(&engine, |master| {
        let status = power::status(master)?;
        let caps = power::read_capabilities(master)?;
        Ok::<_, nixie_i2c_master::Error>((status, caps))
    })
    .unwrap();

    assert!(status.ready());
    assert_eq!(caps.count, 2);
    assert_eq!(caps.find_fixed(20_000), Some(2));
    assert_eq!(
        caps.pdos[0].supply(),
        power::Supply::Fixed {
            max_mv: 5_000,
            max_ma: 3_000
        }
    );
    assert_eq!(engine.bus().peer(power::ADDRESS).received, [0x1D, 0x1C, 0x00]);
}

#[test]
fn power_rejects_implausible_pdo_count() {
    let engine = Engine::new(SimBus::new(vec![Peer::responding(power::ADDRESS, &[9])]));

    let caps = with_master(&engine, |master| power::read_capabilities(master)).unwrap();

    assert_eq!(caps.count, 0);
    assert_eq!(caps.iter().count(), 0);
    // Only the count was fetched.
    assert_eq!(engine.bus().peer(power::ADDRESS).received, [0x1C]);
}

#[test]
fn power_request_writes_little_endian_word() {
    let engine = Engine::new(SimBus::new(vec![Peer::new(power::ADDRESS)]));

    with_master(&engine, |master| power::request(master, 3, 2_000, 2_250)).unwrap();

    let word = power::request_word(3, 2_000, 2_250).to_le_bytes();
    assert_eq!(
        engine.bus().peer(power::ADDRESS).received,
        [0x30, word[0], word[1], word[2], word[3]]
    );
}

fn echo_board(address: u8) -> Peer {
    let mut peer = Peer::new(address);
    peer.echo = true;
    peer
}

#[test]
fn nixie_update_marks_missing_board_and_continues() {
    let mut peers: Vec<Peer> = nixie::TIME_ADDRESSES
        .iter()
        .chain(nixie::DATE_ADDRESSES.iter())
        .filter(|&&address| address != 0x0C)
        .map(|&address| echo_board(address))
        .collect();
    // Answers, but with a stale digit.
    peers.retain(|peer| peer.address != 0x03);
    peers.push(Peer::responding(0x03, &[0x09]));
    let engine = Engine::new(SimBus::new(peers));

    let registers = rtc::Registers([0x56, 0x34, 0x40 | 0x12, 0x02, 0x28, 0x07, 0x26]);
    let digits = nixie::Digits::from_registers(&registers);

    let status = with_master(&engine, |master| nixie::update(master, &digits));

    for address in nixie::TIME_ADDRESSES.iter().chain(nixie::DATE_ADDRESSES.iter()) {
        let expected = *address != 0x0C && *address != 0x03;
        assert_eq!(status.is_ok(*address), expected, "board {:#04x}", address);
    }
    assert_eq!(engine.error_count(), 1);
    assert_eq!(engine.bus().peer(0x01).received, [1]);
    assert_eq!(engine.bus().peer(0x0E).received, [6]);
}

fn all_boards() -> Vec<Peer> {
    nixie::TIME_ADDRESSES
        .iter()
        .chain(nixie::DATE_ADDRESSES.iter())
        .map(|&address| echo_board(address))
        .collect()
}

#[test]
fn nixie_display_skips_unchanged_digits() {
    let engine = Engine::new(SimBus::new(all_boards()));
    let registers = rtc::Registers([0x56, 0x34, 0x40 | 0x12, 0x02, 0x28, 0x07, 0x26]);
    let digits = nixie::Digits::from_registers(&registers);
    let mut display = nixie::Display::new();

    with_master(&engine, |master| {
        assert!(display.refresh(master, &digits).all_ok());
        let sent = engine.bus().log().len();

        assert!(display.refresh(master, &digits).all_ok());
        assert_eq!(engine.bus().log().len(), sent);

        let mut next = registers;
        next.0[0] = 0x57;
        display.refresh(master, &nixie::Digits::from_registers(&next));
        assert!(engine.bus().log().len() > sent);
    });

    assert_eq!(engine.bus().peer(0x06).received, [6, 7]);
    assert_eq!(engine.bus().peer(0x01).received, [1, 1]);
}

#[test]
fn nixie_display_retries_after_a_missing_board() {
    let peers = all_boards()
        .into_iter()
        .filter(|peer| peer.address != 0x0A)
        .collect();
    let engine = Engine::new(SimBus::new(peers));
    let registers = rtc::Registers([0x56, 0x34, 0x40 | 0x12, 0x02, 0x28, 0x07, 0x26]);
    let digits = nixie::Digits::from_registers(&registers);
    let mut display = nixie::Display::new();

    with_master(&engine, |master| {
        assert!(!display.refresh(master, &digits).is_ok(0x0A));
        assert!(!display.refresh(master, &digits).is_ok(0x0A));
    });

    assert_eq!(engine.error_count(), 2);
    assert_eq!(engine.bus().peer(0x01).received, [1, 1]);
}
