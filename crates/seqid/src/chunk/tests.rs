use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    ChunkLayout, ChunkSpec, CycleModel, DatePattern, Error, ResumePrefix, SerialChunk,
    SerialState, parse, render_fixed,
};

fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, mi, s))
        .unwrap()
}

fn chunks(specs: &[(&str, &str)]) -> Vec<SerialChunk> {
    specs
        .iter()
        .map(|(name, format)| SerialChunk::new(*name, format).unwrap())
        .collect()
}

/// Renders once per entry of `times`, threading state through.
fn render_all(chunks: &[SerialChunk], times: &[NaiveDateTime]) -> Vec<String> {
    let layout = ChunkLayout::new(chunks).unwrap();
    let mut state = layout.initial_state(&times[0]).unwrap();
    times
        .iter()
        .map(|now| {
            let rendered = layout.render(&state, now).unwrap();
            state = rendered.state;
            rendered.text
        })
        .collect()
}

fn flowno() -> Vec<SerialChunk> {
    chunks(&[
        ("FLOWNO", "Text[FLOWNO][6]"),
        ("DateTime", "DateTime[yyyyMMdd][8][incycle]"),
        ("SerialNo", "SerialNo[1,1,6,,day]"),
    ])
}

#[test]
fn parses_serial_defaults() {
    assert_eq!(
        parse("SerialNo[,,5,,day]").unwrap(),
        ChunkSpec::SerialNo {
            start: 1,
            increment: 1,
            width: Some(5),
            end: None,
            cycle: CycleModel::Day,
            variable_width: false,
        }
    );
    assert_eq!(parse("SerialNo[,,5,,]").unwrap(), parse("SerialNo[,,5,,day]").unwrap());
}

#[test]
fn parses_serial_with_every_parameter() {
    assert_eq!(
        parse("SerialNo[10,5,,100,month][varlen]").unwrap(),
        ChunkSpec::SerialNo {
            start: 10,
            increment: 5,
            width: None,
            end: Some(100),
            cycle: CycleModel::Month,
            variable_width: true,
        }
    );
    for (keyword, cycle) in [
        ("year", CycleModel::Year),
        ("hour", CycleModel::Hour),
        ("minute", CycleModel::Minute),
        ("none", CycleModel::None),
    ] {
        let spec = parse(&format!("SerialNo[1,1,3,,{keyword}]")).unwrap();
        assert!(matches!(spec, ChunkSpec::SerialNo { cycle: c, .. } if c == cycle));
    }
}

#[test]
fn rejects_malformed_serial_formats() {
    for format in [
        "SerialNo[,,,,]",
        "SerialNo[,,0,,]",
        "SerialNo[,0,5,,]",
        "SerialNo[,,5,,week]",
        "SerialNo[,,5,,Day]",
        "SerialNo[,,5]",
        "SerialNo[,,5,,,]",
        "SerialNo[ 1,,5,,day]",
        "SerialNo[+1,,5,,day]",
        "SerialNo[-1,,5,,day]",
        "SerialNo[,,5,,day] ",
        "SerialNo[,,5,,day][varlen2]",
        "SerialNo[,,5,,day][varlen][varlen]",
        "SerialNo[20,,5,10,]",
        "SerialNo[99999999999999999999,,5,,]",
        "SerialNo,,5,,day]",
        "SerialNo[,,5,,day",
        "serialno[,,5,,day]",
        " SerialNo[,,5,,day]",
    ] {
        assert!(
            matches!(parse(format), Err(Error::FormatSyntax { .. })),
            "{format} should not parse"
        );
    }
}

#[test]
fn parses_text_and_datetime() {
    assert_eq!(
        parse("Text[FLOWNO][6]").unwrap(),
        ChunkSpec::Text {
            literal: "FLOWNO".into(),
            width: 6,
        }
    );
    assert_eq!(
        parse("Text[A-[B][4]").unwrap(),
        ChunkSpec::Text {
            literal: "A-[B".into(),
            width: 4,
        }
    );

    let spec = parse("DateTime[yyyyMMdd][8][incycle]").unwrap();
    assert!(spec.is_in_cycle());
    assert!(!parse("DateTime[yyyyMMdd][8]").unwrap().is_in_cycle());
}

#[test]
fn rejects_malformed_text_and_datetime_formats() {
    for format in [
        "Text[][3]",
        "Text[A]",
        "Text[A][]",
        "Text[A][x]",
        "Text[A][1][2]",
        "Text[A] [1]",
        "DateTime[][8]",
        "DateTime[yyyy][4][cycle]",
        "DateTime[yyyy][4][InCycle]",
        "DateTime[yyyy][4][other]",
        "DateTime[yyyy]",
        "DateTime['yyyy][4]",
        "Date[yyyy][4]",
        "",
    ] {
        assert!(
            matches!(parse(format), Err(Error::FormatSyntax { .. })),
            "{format} should not parse"
        );
    }
}

#[test]
fn display_is_canonical_and_reparses() {
    let spec = parse("SerialNo[,,5,,]").unwrap();
    assert_eq!(spec.to_string(), "SerialNo[1,1,5,,day]");
    assert_eq!(spec.to_string().parse::<ChunkSpec>().unwrap(), spec);

    for format in [
        "SerialNo[3,2,,40,none][varlen]",
        "Text[FLOWNO][6]",
        "DateTime[yyyyMMdd][8][incycle]",
    ] {
        assert_eq!(parse(format).unwrap().to_string(), format);
    }
}

#[test]
fn date_pattern_tokens() {
    let now = NaiveDate::from_ymd_opt(2016, 2, 3)
        .and_then(|d| d.and_hms_nano_opt(14, 5, 9, 123_456_789))
        .unwrap();
    let render = |p: &str| DatePattern::new(p).unwrap().format(&now).to_string();

    assert_eq!(render("yyyyMMdd"), "20160203");
    assert_eq!(render("yy-M-d"), "16-2-3");
    assert_eq!(render("y"), "16");
    assert_eq!(render("yyyyy"), "02016");
    assert_eq!(render("HH:mm:ss"), "14:05:09");
    assert_eq!(render("H:m:s"), "14:5:9");
    assert_eq!(render("h tt"), "2 PM");
    assert_eq!(render("hh t"), "02 P");
    assert_eq!(render("fff"), "123");
    assert_eq!(render("fffffff"), "1234567");
    assert_eq!(render("MMM ddd"), "Feb Wed");
    assert_eq!(render("MMMM dddd"), "February Wednesday");
    assert_eq!(render("'year' yyyy"), "year 2016");
    assert_eq!(render("\"at\" HH"), "at 14");
    assert_eq!(render(r"\y yyyy"), "y 2016");
    assert_eq!(render("%d"), "3");
    assert_eq!(render("yyyy/MM/dd"), "2016/02/03");
}

#[test]
fn date_pattern_rejects_bad_templates() {
    for pattern in ["'open", "yyyy\\", "ffffffff"] {
        assert!(matches!(
            DatePattern::new(pattern),
            Err(Error::FormatSyntax { .. })
        ));
    }
}

#[test]
fn text_renders_literal_only_at_declared_width() {
    let now = at(2016, 2, 3, 0, 0, 0);
    let ok = SerialChunk::new("FLOWNO", "Text[FLOWNO][6]").unwrap();
    assert_eq!(render_fixed(&ok, &now).unwrap().as_deref(), Some("FLOWNO"));

    let short = SerialChunk::new("FLOWNO", "Text[FLOWNO][5]").unwrap();
    match render_fixed(&short, &now) {
        Err(Error::ConfigurationMismatch {
            chunk,
            rendered,
            width,
        }) => {
            assert_eq!(chunk, "FLOWNO");
            assert_eq!(rendered, "FLOWNO");
            assert_eq!(width, 5);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn datetime_renders_current_date_at_declared_width() {
    let now = at(2016, 2, 3, 9, 30, 0);
    let ok = SerialChunk::new("Date", "DateTime[yyyyMMdd][8][incycle]").unwrap();
    assert_eq!(render_fixed(&ok, &now).unwrap().as_deref(), Some("20160203"));

    let wrong = SerialChunk::new("Date", "DateTime[yyyyMMdd][6]").unwrap();
    assert!(matches!(
        render_fixed(&wrong, &now),
        Err(Error::ConfigurationMismatch { .. })
    ));
}

#[test]
fn layout_rejects_invalid_chunk_lists() {
    let cases: [&[(&str, &str)]; 4] = [
        &[],
        &[("A", "Text[A][1]")],
        &[("S1", "SerialNo[,,3,,]"), ("S2", "SerialNo[,,3,,]")],
        &[("S", "SerialNo[,,,,][varlen]"), ("A", "Text[A][1]")],
    ];
    for case in cases {
        let list = chunks(case);
        assert!(matches!(
            ChunkLayout::new(&list),
            Err(Error::InvalidChunks { .. })
        ));
    }
}

#[test]
fn serial_increments_and_pads() {
    let now = at(2016, 2, 3, 9, 0, 0);
    let list = chunks(&[("SerialNo", "SerialNo[,,5,,day]")]);
    assert_eq!(render_all(&list, &[now, now, now]), ["00001", "00002", "00003"]);

    let stepped = chunks(&[("SerialNo", "SerialNo[10,5,4,,day]")]);
    assert_eq!(render_all(&stepped, &[now, now, now]), ["0010", "0015", "0020"]);
}

#[test]
fn serial_exhaustion_does_not_wrap() {
    let now = at(2016, 2, 3, 9, 0, 0);
    let list = chunks(&[("SerialNo", "SerialNo[1,1,2,10,none]")]);
    let layout = ChunkLayout::new(&list).unwrap();

    let mut state = layout.initial_state(&now).unwrap();
    for expected in 1..=10 {
        let rendered = layout.render(&state, &now).unwrap();
        assert_eq!(rendered.state.current, expected);
        state = rendered.state;
    }
    match layout.render(&state, &now) {
        Err(Error::SequenceExhausted { chunk, value, end }) => {
            assert_eq!(chunk, "SerialNo");
            assert_eq!(value, 11);
            assert_eq!(end, 10);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(state.current, 10);
}

#[test]
fn fixed_width_serial_overflows_but_varlen_grows() {
    let now = at(2016, 2, 3, 9, 0, 0);
    let fixed = chunks(&[("SerialNo", "SerialNo[98,1,2,,none]")]);
    let layout = ChunkLayout::new(&fixed).unwrap();
    let state = SerialState {
        current: 99,
        anchor: String::new(),
    };
    assert!(matches!(
        layout.render(&state, &now),
        Err(Error::SequenceOverflow {
            value: 100,
            width: 2,
            ..
        })
    ));

    let varlen = chunks(&[
        ("P", "Text[P][1]"),
        ("SerialNo", "SerialNo[98,1,2,,none][varlen]"),
    ]);
    assert_eq!(render_all(&varlen, &[now, now, now]), ["P98", "P99", "P100"]);
}

#[test]
fn incycle_datetime_resets_serial_on_change() {
    let day1 = at(2016, 2, 3, 9, 0, 0);
    let day1_late = at(2016, 2, 3, 23, 59, 59);
    let day2 = at(2016, 2, 4, 0, 0, 1);
    assert_eq!(
        render_all(&flowno(), &[day1, day1_late, day2, day2]),
        [
            "FLOWNO20160203000001",
            "FLOWNO20160203000002",
            "FLOWNO20160204000001",
            "FLOWNO20160204000002",
        ]
    );
}

#[test]
fn cycle_model_resets_without_datetime_chunk() {
    let list = chunks(&[("SerialNo", "SerialNo[,,3,,month]")]);
    let times = [
        at(2016, 2, 3, 9, 0, 0),
        at(2016, 2, 28, 9, 0, 0),
        at(2016, 3, 1, 9, 0, 0),
    ];
    assert_eq!(render_all(&list, &times), ["001", "002", "001"]);

    let hourly = chunks(&[("SerialNo", "SerialNo[,,3,,hour]")]);
    let times = [
        at(2016, 2, 3, 9, 0, 0),
        at(2016, 2, 3, 9, 59, 0),
        at(2016, 2, 3, 10, 0, 0),
    ];
    assert_eq!(render_all(&hourly, &times), ["001", "002", "001"]);
}

#[test]
fn non_cycle_datetime_defers_to_cycle_model() {
    let list = chunks(&[
        ("Month", "DateTime[yyyyMM][6]"),
        ("SerialNo", "SerialNo[,,3,,day]"),
    ]);
    let times = [
        at(2016, 2, 3, 9, 0, 0),
        at(2016, 2, 3, 10, 0, 0),
        at(2016, 2, 4, 9, 0, 0),
    ];
    assert_eq!(render_all(&list, &times), ["201602001", "201602002", "201602001"]);
}

#[test]
fn cycle_none_never_resets() {
    let list = chunks(&[("SerialNo", "SerialNo[,,3,,none]")]);
    let times = [
        at(2016, 2, 3, 9, 0, 0),
        at(2017, 5, 1, 9, 0, 0),
        at(2020, 1, 1, 0, 0, 0),
    ];
    assert_eq!(render_all(&list, &times), ["001", "002", "003"]);
}

#[test]
fn decompose_recovers_counter_and_anchor() {
    let list = flowno();
    let layout = ChunkLayout::new(&list).unwrap();
    let now = at(2016, 2, 5, 0, 0, 0);

    let state = layout.decompose("FLOWNO20160203000042", &now).unwrap();
    assert_eq!(state.current, 42);
    assert_eq!(state.anchor, "20160203");

    for bad in [
        "FLOWNX20160203000042",
        "FLOWNO20160203",
        "FLOWNO2016020300004x",
        "FLOWNO201602030000421",
    ] {
        assert!(matches!(
            layout.decompose(bad, &now),
            Err(Error::InvalidArgument { .. })
        ));
    }
}

fn resume_prefix_of(specs: &[(&str, &str)], now: &NaiveDateTime) -> Option<ResumePrefix> {
    let list = chunks(specs);
    ChunkLayout::new(&list).unwrap().resume_prefix(now).unwrap()
}

fn ordered(text: &str) -> Option<ResumePrefix> {
    Some(ResumePrefix {
        text: text.to_owned(),
        ordered: true,
    })
}

#[test]
fn resume_prefix_only_when_it_pins_the_cycle() {
    let now = at(2016, 2, 3, 9, 0, 0);

    let list = flowno();
    let pinned = ChunkLayout::new(&list).unwrap();
    assert_eq!(pinned.resume_prefix(&now).unwrap(), ordered("FLOWNO20160203"));

    let daily = [("P", "Text[INV][3]"), ("S", "SerialNo[,,5,,day]")];
    assert_eq!(resume_prefix_of(&daily, &now), None);

    let endless = [("P", "Text[INV][3]"), ("S", "SerialNo[,,5,,none]")];
    assert_eq!(resume_prefix_of(&endless, &now), ordered("INV"));

    let trailing_date = [
        ("S", "SerialNo[,,5,,none]"),
        ("D", "DateTime[yyyyMMdd][8][incycle]"),
    ];
    assert_eq!(resume_prefix_of(&trailing_date, &now), None);
}

#[test]
fn resume_prefix_stops_at_a_date_outside_the_cycle() {
    let now = at(2016, 2, 3, 9, 0, 0);

    // the date changes daily but never resets the counter
    let dated = [("D", "DateTime[yyyyMMdd][8]"), ("S", "SerialNo[1,1,6,,none]")];
    assert_eq!(
        resume_prefix_of(&dated, &now),
        Some(ResumePrefix {
            text: String::new(),
            ordered: false,
        })
    );

    let clocked = [
        ("P", "Text[NO][2]"),
        ("D", "DateTime[yyyyMMdd][8][incycle]"),
        ("T", "DateTime[HHmm][4]"),
        ("S", "SerialNo[1,1,4,,day]"),
    ];
    assert_eq!(
        resume_prefix_of(&clocked, &now),
        Some(ResumePrefix {
            text: "NO20160203".to_owned(),
            ordered: false,
        })
    );
}

#[test]
fn variable_width_serials_are_never_ordered() {
    let now = at(2016, 2, 3, 9, 0, 0);
    let grown = [("P", "Text[INV][3]"), ("S", "SerialNo[1,1,,,none][varlen]")];
    assert_eq!(
        resume_prefix_of(&grown, &now),
        Some(ResumePrefix {
            text: "INV".to_owned(),
            ordered: false,
        })
    );
}

#[test]
fn clones_share_their_spec() {
    let chunk = SerialChunk::new("S", "SerialNo[,,5,,]").unwrap();
    let reparsed = SerialChunk::new("S", "SerialNo[,,5,,]").unwrap();
    assert!(chunk.shares_spec(&chunk.clone()));
    assert!(!chunk.shares_spec(&reparsed));
    assert_eq!(chunk, reparsed);
}

#[cfg(feature = "serde")]
#[test]
fn chunk_spec_serializes_with_type_tag() {
    let spec = parse("DateTime[yyyyMMdd][8][incycle]").unwrap();
    let json = serde_json::to_value(&spec).unwrap();
    assert_eq!(json["type"], "DateTime");
    assert_eq!(json["pattern"], "yyyyMMdd");
    assert_eq!(json["in_cycle"], true);

    let back: ChunkSpec = serde_json::from_value(json).unwrap();
    assert_eq!(back, spec);
}
