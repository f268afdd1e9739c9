use std::{sync::Mutex, thread::scope};

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::{BackingStore, Error, MemoryStore, SequenceManager, SerialChunk, TimeSource};

/// A clock that stays put until moved.
struct StepClock {
    now: Mutex<NaiveDateTime>,
}

impl StepClock {
    fn at(y: i32, m: u32, d: u32) -> Self {
        Self {
            now: Mutex::new(day(y, m, d)),
        }
    }

    fn set(&self, y: i32, m: u32, d: u32) {
        *self.now.lock().unwrap() = day(y, m, d);
    }
}

impl TimeSource for StepClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(10, 0, 0))
        .unwrap()
}

const FLOWNO: [(&str, &str); 3] = [
    ("FLOWNO", "Text[FLOWNO][6]"),
    ("DateTime", "DateTime[yyyyMMdd][8][incycle]"),
    ("SerialNo", "SerialNo[1,1,6,,day]"),
];

fn flowno() -> Vec<SerialChunk> {
    FLOWNO
        .iter()
        .map(|(name, format)| SerialChunk::new(*name, format).unwrap())
        .collect()
}

#[test]
fn bank_number_resets_each_day() {
    let clock = StepClock::at(2016, 2, 3);
    let manager = SequenceManager::new(&clock);
    let store = MemoryStore::new();
    let chunks = flowno();

    let next = || manager.new_sno(&store, "SysUser", "BankNo", &chunks).unwrap();
    assert_eq!(next(), "FLOWNO20160203000001");
    assert_eq!(next(), "FLOWNO20160203000002");
    clock.set(2016, 2, 4);
    assert_eq!(next(), "FLOWNO20160204000001");
    assert_eq!(next(), "FLOWNO20160204000002");
}

#[test]
fn formats_are_parsed_once_and_share_the_sequence() {
    let clock = StepClock::at(2016, 2, 3);
    let manager = SequenceManager::new(&clock);
    let store = MemoryStore::new();

    assert_eq!(
        manager
            .new_sno_from_formats(&store, "SysUser", "BankNo", &FLOWNO)
            .unwrap(),
        "FLOWNO20160203000001"
    );
    assert_eq!(
        manager
            .new_sno(&store, "SysUser", "BankNo", &flowno())
            .unwrap(),
        "FLOWNO20160203000002"
    );

    let broken = [("FLOWNO", "Text[FLOWNO] [6]"), ("SerialNo", "SerialNo[,,6,,]")];
    assert!(matches!(
        manager.new_sno_from_formats(&store, "SysUser", "BankNo", &broken),
        Err(Error::FormatSyntax { .. })
    ));
}

#[test]
fn renaming_a_chunk_starts_a_new_sequence() {
    let clock = StepClock::at(2016, 2, 3);
    let manager = SequenceManager::new(&clock);
    let store = MemoryStore::new();

    let a = [("Prefix", "Text[INV][3]"), ("SerialNo", "SerialNo[,,4,,none]")];
    let b = [("Prefix2", "Text[INV][3]"), ("SerialNo", "SerialNo[,,4,,none]")];
    let sno = |chunks: &[(&str, &str)]| {
        manager
            .new_sno_from_formats(&store, "Invoice", "No", chunks)
            .unwrap()
    };
    assert_eq!(sno(&a), "INV0001");
    assert_eq!(sno(&a), "INV0002");
    assert_eq!(sno(&b), "INV0001");
    assert_eq!(sno(&a), "INV0003");
}

#[test]
fn text_width_mismatch_fails_the_allocation() {
    let manager = SequenceManager::new(StepClock::at(2016, 2, 3));
    let store = MemoryStore::new();
    let chunks = [("FLOWNO", "Text[FLOWNO][5]"), ("SerialNo", "SerialNo[,,6,,]")];
    assert!(matches!(
        manager.new_sno_from_formats(&store, "SysUser", "BankNo", &chunks),
        Err(Error::ConfigurationMismatch { width: 5, .. })
    ));
    assert!(
        manager
            .show_current_snos::<&str>(None, None, None)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn datetime_chunk_uses_the_local_date() {
    let manager = SequenceManager::default();
    let store = MemoryStore::new();
    let chunks = [
        ("Date", "DateTime[yyyyMMdd][8][incycle]"),
        ("SerialNo", "SerialNo[,,3,,]"),
    ];

    let before = Local::now().format("%Y%m%d").to_string();
    let sno = manager
        .new_sno_from_formats(&store, "Doc", "No", &chunks)
        .unwrap();
    let after = Local::now().format("%Y%m%d").to_string();

    assert_eq!(sno.len(), 11);
    assert!(sno.bytes().all(|b| b.is_ascii_digit()));
    assert!(sno == format!("{before}001") || sno == format!("{after}001"));
}

#[test]
fn exhausted_serial_is_an_error() {
    let manager = SequenceManager::new(StepClock::at(2016, 2, 3));
    let store = MemoryStore::new();
    let chunks = [("SerialNo", "SerialNo[1,1,2,10,day]")];

    for expected in 1..=10 {
        assert_eq!(
            manager
                .new_sno_from_formats(&store, "T", "C", &chunks)
                .unwrap(),
            format!("{expected:02}")
        );
    }
    assert!(matches!(
        manager.new_sno_from_formats(&store, "T", "C", &chunks),
        Err(Error::SequenceExhausted { value: 11, end: 10, .. })
    ));
}

#[test]
fn reset_and_show_address_snos_by_name_only() {
    let manager = SequenceManager::new(StepClock::at(2016, 2, 3));
    let store = MemoryStore::new();
    let chunks = flowno();
    manager.new_sno(&store, "SysUser", "BankNo", &chunks).unwrap();

    let names = ["FLOWNO", "DateTime", "SerialNo"];
    manager
        .reset_sno("SysUser", "BankNo", &names, Some("FLOWNO20160203000500"))
        .unwrap();

    let shown = manager
        .show_current_snos(Some("SysUser"), Some("BankNo"), Some(&names[..]))
        .unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].value, "FLOWNO20160203000500");
    assert_eq!(shown[0].chunk_key, "FLOWNO,DateTime,SerialNo");
    assert_eq!(
        manager
            .show_current_snos(Some("SysUser"), Some("BankNo"), Some(&names[..]))
            .unwrap(),
        shown
    );

    assert_eq!(
        manager.new_sno(&store, "SysUser", "BankNo", &chunks).unwrap(),
        "FLOWNO20160203000501"
    );

    assert!(matches!(
        manager.reset_sno::<&str>("SysUser", "BankNo", &[], None),
        Err(Error::InvalidArgument { .. })
    ));
}

#[test]
fn ids_cache_reset_and_force() {
    let manager = SequenceManager::new(StepClock::at(2016, 2, 3));
    let store = MemoryStore::new();
    store.insert_id("User", "Id", 7).unwrap();

    assert_eq!(manager.new_id(&store, "User", "Id").unwrap(), 8);
    assert_eq!(manager.new_id(&store, "User", "Id").unwrap(), 9);

    store.insert_id("User", "Id", 50).unwrap();
    assert_eq!(manager.new_id(&store, "User", "Id").unwrap(), 10);
    assert_eq!(manager.new_id_force(&store, "User", "Id").unwrap(), 51);

    manager.reset_id("User", "Id", None).unwrap();
    assert_eq!(manager.new_id(&store, "User", "Id").unwrap(), 51);

    manager.reset_id("User", "Id", Some(1000)).unwrap();
    assert_eq!(manager.new_id(&store, "User", "Id").unwrap(), 1001);

    manager.add_id("Order", "Id", 0).unwrap();
    assert!(matches!(
        manager.add_id("Order", "Id", 0),
        Err(Error::AlreadyTracked { .. })
    ));
    assert_eq!(manager.new_id(&store, "Order", "Id").unwrap(), 1);

    let shown = manager.show_current_ids(None, None).unwrap();
    assert_eq!(shown.len(), 2);
    assert_eq!(shown, manager.show_current_ids(None, None).unwrap());
    assert_eq!(manager.show_current_ids(Some("User"), None).unwrap()[0].value, 1001);
}

#[test]
fn empty_names_are_rejected() {
    let manager = SequenceManager::new(StepClock::at(2016, 2, 3));
    let store = MemoryStore::new();
    assert!(matches!(
        manager.new_id(&store, "", "Id"),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        manager.new_id_force(&store, "User", ""),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        manager.new_sno(&store, "User", "No", &[]),
        Err(Error::InvalidArgument { .. })
    ));
    assert_eq!(store.reads(), 0);
}

#[test]
fn managers_do_not_share_state() {
    let store = MemoryStore::new();
    let first = SequenceManager::new(StepClock::at(2016, 2, 3));
    let second = SequenceManager::new(StepClock::at(2016, 2, 3));

    assert_eq!(first.new_id(&store, "User", "Id").unwrap(), 1);
    assert_eq!(first.new_id(&store, "User", "Id").unwrap(), 2);
    assert_eq!(second.new_id(&store, "User", "Id").unwrap(), 1);
}

#[test]
fn concurrent_new_id_through_dyn_store() {
    let threads = num_cpus::get().max(4);
    const PER_THREAD: usize = 500;

    let memory = MemoryStore::new();
    let store: &(dyn BackingStore + Sync) = &memory;
    let manager = SequenceManager::new(StepClock::at(2016, 2, 3));
    let seen = Mutex::new(Vec::new());

    scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                let ids: Vec<i64> = (0..PER_THREAD)
                    .map(|_| manager.new_id(store, "User", "Id").unwrap())
                    .collect();
                seen.lock().unwrap().extend(ids);
            });
        }
    });

    let mut seen = seen.into_inner().unwrap();
    seen.sort_unstable();
    let total = i64::try_from(threads * PER_THREAD).unwrap();
    assert_eq!(seen, (1..=total).collect::<Vec<_>>());
}
