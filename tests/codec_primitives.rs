use proptest::prelude::*;
use simreport::report::codec::cursor::{BinaryCursor, decimal_to_raw, fixed_sentinel};
use simreport::report::codec::line_format::{FieldKind, LineFormat};
use simreport::report::codec::scanner::{Row, TextValue, parse_token};
use simreport::{FileKind, Location, ReportError, Value};

const KIND: FileKind = FileKind::Conditions;

#[test]
fn cursor_round_trips_every_primitive() {
    let mut writer = BinaryCursor::new(KIND, vec![0u8; 1 + 1 + 2 + 4 + 4 + 2 + 3 + 6]);
    writer.write_u8(200).expect("u8");
    writer.write_i8(-5).expect("i8");
    writer.write_i16(-1234).expect("i16");
    writer.write_i32(123_456_789).expect("i32");
    writer.write_f32(45.5).expect("f32");
    writer.write_fixed(2, 2, 12.34).expect("fixed2");
    writer.write_fixed(3, 3, 1234.567).expect("fixed3");
    writer.write_string("hello").expect("string");
    assert!(writer.is_exhausted(), "writer should fill its buffer exactly");

    let blob = writer.into_inner();
    let mut reader = BinaryCursor::new(KIND, blob.as_slice());
    assert_eq!(reader.read_u8().unwrap(), 200);
    assert_eq!(reader.read_i8().unwrap(), -5);
    assert_eq!(reader.read_i16().unwrap(), -1234);
    assert_eq!(reader.read_i32().unwrap(), 123_456_789);
    assert_eq!(reader.read_f32().unwrap(), 45.5);
    assert_eq!(reader.read_fixed(2, 2).unwrap(), 12.34);
    assert_eq!(reader.read_fixed(3, 3).unwrap(), 1234.567);
    assert_eq!(reader.read_string().unwrap(), "hello");
    reader.expect_exhausted().expect("nothing left over");
}

#[test]
fn cursor_layout_is_little_endian() {
    let mut writer = BinaryCursor::new(KIND, vec![0u8; 4 + 2 + 3]);
    writer.write_i32(0x0102_0304).unwrap();
    writer.write_fixed_raw(2, 0x0A0B).unwrap();
    writer.write_fixed_raw(3, 0x0C0D0E).unwrap();
    assert_eq!(writer.into_inner(), vec![0x04, 0x03, 0x02, 0x01, 0x0B, 0x0A, 0x0E, 0x0D, 0x0C]);
}

#[test]
fn fixed_point_is_exact_for_12_34() {
    let mut writer = BinaryCursor::new(KIND, vec![0u8; 2]);
    writer.write_fixed(2, 2, 12.34).unwrap();
    let blob = writer.into_inner();
    assert_eq!(u16::from_le_bytes([blob[0], blob[1]]), 1234, "12.34 must store raw 1234");

    let mut reader = BinaryCursor::new(KIND, blob.as_slice());
    assert_eq!(reader.read_fixed(2, 2).unwrap(), 12.34);
}

#[test]
fn fixed_point_truncates_extra_digits() {
    assert_eq!(decimal_to_raw("12.34", 2), Some(1234));
    assert_eq!(decimal_to_raw("12.349", 2), Some(1234));
    assert_eq!(decimal_to_raw("12.3", 2), Some(1230));
    assert_eq!(decimal_to_raw("12", 2), Some(1200));
    assert_eq!(decimal_to_raw(".5", 1), Some(5));
    assert_eq!(decimal_to_raw("-1.0", 1), None);
    assert_eq!(decimal_to_raw("1e3", 1), None);
    assert_eq!(decimal_to_raw("", 1), None);

    // Same input, same result, every time.
    let first = decimal_to_raw("0.129", 2);
    for _ in 0..10 {
        assert_eq!(decimal_to_raw("0.129", 2), first);
    }
}

#[test]
fn fixed_point_sentinel_reads_as_minus_one() {
    assert_eq!(fixed_sentinel(2), 0xFFFF);
    assert_eq!(fixed_sentinel(3), 0xFF_FFFF);

    let mut writer = BinaryCursor::new(KIND, vec![0u8; 5]);
    writer.write_fixed(2, 1, -1.0).unwrap();
    writer.write_fixed(3, 3, -1.0).unwrap();
    let blob = writer.into_inner();
    assert_eq!(blob, vec![0xFF; 5]);

    let mut reader = BinaryCursor::new(KIND, blob.as_slice());
    assert_eq!(reader.read_fixed(2, 1).unwrap(), -1.0);
    assert_eq!(reader.read_fixed(3, 3).unwrap(), -1.0);
}

#[test]
fn fixed_point_rejects_values_out_of_range() {
    let mut writer = BinaryCursor::new(KIND, vec![0u8; 2]);
    let err = writer.write_fixed(2, 2, 655.35).unwrap_err();
    assert!(matches!(err, ReportError::FieldOverflow { .. }), "got {:?}", err);
    let err = writer.write_fixed(2, 2, -3.0).unwrap_err();
    assert!(matches!(err, ReportError::FieldOverflow { .. }), "got {:?}", err);
    assert_eq!(writer.position(), 0, "failed writes must not advance");
}

#[test]
fn cursor_refuses_to_cross_the_end() {
    let blob = [1u8, 2, 3];
    let mut reader = BinaryCursor::new(KIND, &blob[..]);
    assert_eq!(reader.read_i16().unwrap(), 0x0201);
    match reader.read_i16() {
        Err(ReportError::OutOfBounds {
            kind,
            offset,
            width,
            len,
        }) => {
            assert_eq!((kind, offset, width, len), (KIND, 2, 2, 3));
        }
        other => panic!("expected OutOfBounds, got {:?}", other),
    }
    assert_eq!(reader.position(), 2, "failed read must not advance");

    let mut writer = BinaryCursor::new(KIND, vec![0u8; 3]);
    assert!(matches!(writer.write_i32(1), Err(ReportError::OutOfBounds { .. })));
}

#[test]
fn string_longer_than_length_byte_is_rejected() {
    let long = "x".repeat(256);
    let mut writer = BinaryCursor::new(KIND, vec![0u8; 300]);
    assert!(matches!(writer.write_string(&long), Err(ReportError::FieldOverflow { .. })));
    writer.write_string(&long[..255]).expect("255 bytes fit");
    assert_eq!(writer.position(), 256);
}

#[test]
fn negative_counts_are_malformed() {
    let blob = (-3i32).to_le_bytes();
    let mut reader = BinaryCursor::new(KIND, &blob[..]);
    match reader.read_count_i32() {
        Err(ReportError::MalformedReport { at, .. }) => assert_eq!(at, Location::Offset(0)),
        other => panic!("expected MalformedReport, got {:?}", other),
    }
}

#[test]
fn trailing_bytes_are_malformed() {
    let blob = [0u8; 3];
    let mut reader = BinaryCursor::new(KIND, &blob[..]);
    reader.read_i16().unwrap();
    match reader.expect_exhausted() {
        Err(ReportError::MalformedReport { at, .. }) => assert_eq!(at, Location::Offset(2)),
        other => panic!("expected MalformedReport, got {:?}", other),
    }
}

#[test]
fn descriptor_widths_and_kinds() {
    let format = LineFormat::parse("8i8iCfAc2Fn3", &["a", "b", "c", "d", "e"]).expect("valid descriptor");
    let widths: Vec<u8> = format.fields().iter().map(|f| f.width).collect();
    assert_eq!(widths, vec![8, 8, 12, 10, 15]);
    assert_eq!(format.column_width(), 53);
    assert_eq!(format.fields()[3].kind, FieldKind::Fixed2 { decimals: 2 });
    assert_eq!(format.fields()[4].kind, FieldKind::Fixed3 { decimals: 3 });
    assert_eq!(format.byte_size(), 4 + 4 + 4 + 2 + 3);
}

#[test]
fn descriptor_repeat_and_skip() {
    let format = LineFormat::parse("c1*_s*", &["a", "b", "c", "d"]).expect("valid descriptor");
    let kinds: Vec<FieldKind> = format.fields().iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FieldKind::Fixed2 { decimals: 1 },
            FieldKind::Fixed2 { decimals: 1 },
            FieldKind::Skip,
            FieldKind::Short,
            FieldKind::Short,
        ]
    );
    assert_eq!(format.field_count(), 5);
    assert_eq!(format.stored_count(), 4);
    assert_eq!(format.byte_size(), 2 + 2 + 2 + 2);
}

#[test]
fn descriptor_errors() {
    let cases: [(&str, &[&'static str]); 6] = [
        ("x", &["a"]),
        ("c", &["a"]),
        ("cq", &["a"]),
        ("*i", &["a", "b"]),
        ("i5", &["a"]),
        ("ii", &["a"]),
    ];
    for (descriptor, names) in cases {
        match LineFormat::parse(descriptor, names) {
            Err(ReportError::InvalidFormatDescriptor { descriptor: d, .. }) => assert_eq!(d, descriptor),
            other => panic!("descriptor {:?} should be rejected, got {:?}", descriptor, other),
        }
    }
    assert!(LineFormat::parse("ii", &["a", "b", "c"]).is_err(), "extra names are an error");
    assert!(
        LineFormat::parse_fixed_columns("4ii", &["a", "b"]).is_err(),
        "every fixed column needs a width"
    );
}

#[test]
fn unavailable_literal_is_minus_one_for_every_kind() {
    let format = LineFormat::parse("bsifc2n3", &["b", "s", "i", "f", "c", "n"]).unwrap();
    let record = format
        .parse_row(KIND, &Row::tokens(0, "* ** * *** * *"))
        .expect("sentinels parse");
    for (name, value) in record.iter() {
        assert_eq!(value.as_f64(), -1.0, "field {} should read -1", name);
        assert!(value.is_unavailable());
    }

    let mut writer = BinaryCursor::new(KIND, vec![0u8; format.byte_size()]);
    format.write_record(&mut writer, &record).unwrap();
    let blob = writer.into_inner();
    let mut reader = BinaryCursor::new(KIND, blob.as_slice());
    let decoded = format.read_record(&mut reader).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn tokens_are_range_checked() {
    assert_eq!(parse_token("127", FieldKind::Byte), Ok(TextValue::Int(127)));
    assert!(parse_token("128", FieldKind::Byte).is_err());
    assert!(parse_token("40000", FieldKind::Short).is_err());
    assert!(parse_token("abc", FieldKind::Int).is_err());
    assert!(parse_token("1.5", FieldKind::Int).is_err());
    assert_eq!(parse_token("655.34", FieldKind::Fixed2 { decimals: 2 }), Ok(TextValue::FixedRaw(65534)));
    assert!(
        parse_token("655.35", FieldKind::Fixed2 { decimals: 2 }).is_err(),
        "the all-ones raw value is reserved"
    );
    assert_eq!(parse_token("anything", FieldKind::Skip), Ok(TextValue::Skip));
}

#[test]
fn non_finite_floats_are_rejected() {
    for token in ["nan", "NaN", "inf", "-inf", "infinity", "1e40"] {
        assert!(parse_token(token, FieldKind::Float).is_err(), "{} was accepted", token);
    }
    assert_eq!(parse_token("-1e3", FieldKind::Float), Ok(TextValue::Float(-1000.0)));
}

#[test]
fn rows_with_wrong_field_count_are_malformed() {
    let format = LineFormat::parse("iif", &["a", "b", "c"]).unwrap();
    match format.parse_row(KIND, &Row::tokens(17, "1 2")) {
        Err(ReportError::MalformedReport { at, .. }) => assert_eq!(at, Location::Line(17)),
        other => panic!("expected MalformedReport, got {:?}", other),
    }
}

#[test]
fn fixed_columns_may_touch() {
    let format = LineFormat::parse_fixed_columns("4i6f5c1", &["a", "b", "c"]).unwrap();
    let row = Row::columns(KIND, 0, "12341.2345123.4", &format).expect("columns slice");
    assert_eq!(row.fields, vec!["1234", "1.2345", "123.4"]);

    let record = format.parse_row(KIND, &row).unwrap();
    assert_eq!(record.get("a"), Some(Value::Int(1234)));
    assert_eq!(record.get("c"), Some(Value::Fixed(123.4)));

    assert!(Row::columns(KIND, 0, "   1   2.0     ", &format).is_err(), "blank column");
    assert!(Row::columns(KIND, 0, "12341.2345123.4X", &format).is_err(), "line too long");
    assert!(Row::columns(KIND, 0, "12341.2345123.", &format).is_err(), "line ends inside the last column");
}

proptest! {
    #[test]
    fn reads_never_cross_the_buffer(
        bytes in proptest::collection::vec(any::<u8>(), 0..32),
        widths in proptest::collection::vec(0usize..6, 0..16),
    ) {
        let mut reader = BinaryCursor::new(KIND, bytes.as_slice());
        for width in widths {
            let before = reader.position();
            let result = match width {
                0 => reader.read_u8().map(|_| 1),
                1 => reader.read_i16().map(|_| 2),
                2 => reader.read_i32().map(|_| 4),
                3 => reader.read_f32().map(|_| 4),
                4 => reader.read_fixed(3, 2).map(|_| 3),
                _ => reader.read_string().map(|s| 1 + s.len()),
            };
            match result {
                Ok(advanced) => prop_assert_eq!(reader.position(), before + advanced),
                Err(ReportError::OutOfBounds { .. }) => prop_assert_eq!(reader.position() <= bytes.len(), true),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
            prop_assert!(reader.position() <= bytes.len());
        }
    }

    #[test]
    fn fixed_point_truncation_is_deterministic(int_part in 0u32..600, frac in 0u32..100_000) {
        let text = format!("{}.{:05}", int_part, frac);
        let raw = decimal_to_raw(&text, 2).expect("decimal parses");
        prop_assert_eq!(raw, (int_part * 100 + frac / 1000) as u64);

        let mut writer = BinaryCursor::new(KIND, vec![0u8; 2]);
        writer.write_fixed_raw(2, raw as u32).unwrap();
        let blob = writer.into_inner();
        let mut reader = BinaryCursor::new(KIND, blob.as_slice());
        prop_assert_eq!(reader.read_fixed_raw(2).unwrap() as u64, raw);
    }
}
