//! End-to-end reading tests

use std::cell::RefCell;
use std::rc::Rc;

use csvmap_io::{
    BoxError, CsvMapError, CsvRecord, Mapper, MapperConfig, MapperOptions, OverrideMapping,
    TokenizerOptions, UnmarshalCsv, UnmarshalQuotedCsv, UnmarshalText,
};

#[derive(Debug, Default, CsvRecord)]
pub struct Captures {
    #[csv("[line]")]
    pub line: usize,
    #[csv("[raw]")]
    pub raw: Vec<String>,
    #[csv("[rawData]")]
    pub raw_data: String,
    pub foo: String,
    pub bar: String,
    pub baz: String,
}

const FOO_BAR_BAZ: &str = "Foo,Bar,Baz\nAaa,\"Bbb\",Ccc\nDdd,Eee,Fff";

#[test]
fn test_read_positional_with_captures() {
    let mapper = Mapper::<Captures>::new().unwrap();
    let mut reader = mapper.reader(FOO_BAR_BAZ.as_bytes(), TokenizerOptions::default()).unwrap();

    let first = reader.read().unwrap().unwrap();
    assert_eq!(first.line, 2);
    assert_eq!(first.raw, vec!["Aaa", "Bbb", "Ccc"]);
    assert_eq!(first.raw_data, "Aaa,\"Bbb\",Ccc\n");
    assert_eq!(first.foo, "Aaa");
    assert_eq!(first.bar, "Bbb");
    assert_eq!(first.baz, "Ccc");

    let second = reader.read().unwrap().unwrap();
    assert_eq!(second.line, 3);
    assert_eq!(second.raw, vec!["Ddd", "Eee", "Fff"]);

    assert!(reader.read().unwrap().is_none());
    assert!(reader.read().unwrap().is_none());
}

#[test]
fn test_raw_data_bytes() {
    #[derive(Debug, Default, CsvRecord)]
    pub struct Bytes {
        #[csv("[rawData]")]
        pub raw_data: Vec<u8>,
        pub foo: String,
    }
    let mapper = Mapper::<Bytes>::new().unwrap();
    let rows = mapper
        .reader(FOO_BAR_BAZ.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read_all()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].raw_data, b"Aaa,\"Bbb\",Ccc\n");
    assert_eq!(rows[1].foo, "Ddd");
}

#[derive(Debug, Default, CsvRecord)]
pub struct Named {
    #[csv("Name")]
    pub name: String,
    #[csv("Age")]
    pub age: i32,
}

#[test]
fn test_named_bindings_follow_headers() {
    let data = "Age,Other,Name\n51,x,Bilbo\n33,y,Frodo\n";
    let mapper = Mapper::<Named>::new().unwrap();
    let rows = mapper
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read_all()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "Bilbo");
    assert_eq!(rows[0].age, 51);
    assert_eq!(rows[1].name, "Frodo");
}

#[test]
fn test_header_not_present() {
    let data = "Name,Years\nBilbo,111\n";
    let mapper = Mapper::<Named>::new().unwrap();
    let err = mapper
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read()
        .unwrap_err();
    assert!(err.to_string().contains("Age"));
    assert!(err.to_string().contains("not present"));

    let mapper =
        Mapper::<Named>::with_options(MapperOptions::default().with_ignore_unknown_field_names(true))
            .unwrap();
    let row = mapper
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(row.name, "Bilbo");
    assert_eq!(row.age, 0);
}

#[test]
fn test_headers_missing_and_supplied() {
    let options = TokenizerOptions {
        no_header: true,
        ..Default::default()
    };
    let mapper = Mapper::<Named>::new().unwrap();
    let mut reader = mapper.reader("Bilbo,111\n".as_bytes(), options).unwrap();
    let err = reader.read().unwrap_err();
    assert!(matches!(err, CsvMapError::HeadersNotPresent));

    let mut reader = mapper
        .reader("Bilbo,111\n".as_bytes(), options)
        .unwrap()
        .supply_headers(["Name", "Age"]);
    let row = reader.read().unwrap().unwrap();
    assert_eq!(row.name, "Bilbo");
    assert_eq!(row.age, 111);
}

#[test]
fn test_supplied_headers_override_source() {
    let mapper = Mapper::<Named>::new().unwrap();
    let row = mapper
        .reader("a,b\n40,Sam\n".as_bytes(), TokenizerOptions::default())
        .unwrap()
        .supply_headers(vec!["Age".to_string(), "Name".to_string()])
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(row.name, "Sam");
    assert_eq!(row.age, 40);
}

#[test]
fn test_duplicate_header_last_wins() {
    #[derive(Debug, Default, CsvRecord)]
    pub struct Repeated {
        #[csv("A")]
        pub a: String,
    }
    let mapper = Mapper::<Repeated>::new().unwrap();
    let row = mapper
        .reader("A,B,A\nfirst,x,last\n".as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(row.a, "last");

    let options = TokenizerOptions {
        no_header: true,
        ..Default::default()
    };
    let row = mapper
        .reader("first,x,last\n".as_bytes(), options)
        .unwrap()
        .supply_headers(["A", "B", "A"])
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(row.a, "last");
}

#[test]
fn test_short_record_out_of_range() {
    let options = TokenizerOptions {
        fields_per_record: csvmap_io::FieldCount::Any,
        ..Default::default()
    };
    let mapper = Mapper::<Named>::new().unwrap();
    let err = mapper
        .reader("Name,Age\nBilbo\n".as_bytes(), options)
        .unwrap()
        .read()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "csv field index 2 out of range in record (record length: 1)"
    );
}

#[derive(Debug, Default, CsvRecord)]
pub struct Optional {
    pub value: Option<i32>,
    pub label: Option<String>,
}

#[test]
fn test_optional_fields() {
    let data = "value,label\n,\n\"\",\"\"\n12,x\n";
    let mapper = Mapper::<Optional>::new().unwrap();
    let rows = mapper
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read_all()
        .unwrap();
    assert_eq!(rows[0].value, None);
    assert_eq!(rows[0].label, None);
    // Quoted empty: scalars stay None, strings become Some("")
    assert_eq!(rows[1].value, None);
    assert_eq!(rows[1].label.as_deref(), Some(""));
    assert_eq!(rows[2].value, Some(12));
    assert_eq!(rows[2].label.as_deref(), Some("x"));
}

#[derive(Debug, Default, CsvRecord)]
pub struct Counts {
    pub name: String,
    pub count: i32,
    pub ratio: f64,
    pub flag: bool,
}

#[test]
fn test_empty_values_policy() {
    let data = "name,count,ratio,flag\nx,,,\n";
    let mapper = Mapper::<Counts>::new().unwrap();
    let err = mapper
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read()
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot convert value \"\" to i32");

    let mapper =
        Mapper::<Counts>::with_options(MapperOptions::default().with_default_empty_values(true))
            .unwrap();
    let row = mapper
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(row.count, 0);
    assert_eq!(row.ratio, 0.0);
    assert!(!row.flag);
}

#[test]
fn test_read_all_with_absorbing_handler() {
    let data = "name,count,ratio,flag\na,1,1.5,true\nb,x,1,true\nc,3,2,f\nd,4,bad,t\ne,5,0,0\n";
    let failures = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&failures);
    let mapper = Mapper::<Counts>::new().unwrap();
    let rows = mapper
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .with_error_handler(move |err: CsvMapError, line: usize| -> csvmap_io::Result<()> {
            seen.borrow_mut().push((line, err.to_string()));
            Ok(())
        })
        .read_all()
        .unwrap();

    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "c", "e"]);
    let failures = failures.borrow();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].0, 3);
    assert_eq!(failures[1].0, 5);
    assert_eq!(failures[1].1, "cannot convert value \"bad\" to f64");
}

#[test]
fn test_read_all_without_handler_annotates_line() {
    let data = "name,count,ratio,flag\na,1,1,t\nb,x,1,t\n";
    let mapper = Mapper::<Counts>::new().unwrap();
    let err = mapper
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read_all()
        .unwrap_err();
    assert_eq!(err.to_string(), "line 3: cannot convert value \"x\" to i32");
    assert!(matches!(err.root(), CsvMapError::Parse { .. }));
}

#[test]
fn test_handler_replacement_error_stops() {
    let data = "name,count,ratio,flag\nb,x,1,t\nc,3,2,f\n";
    let mapper = Mapper::<Counts>::new().unwrap();
    let err = mapper
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .with_error_handler(|_err: CsvMapError, line: usize| -> csvmap_io::Result<()> {
            Err(CsvMapError::custom(format!("stopped at {line}")))
        })
        .read_all()
        .unwrap_err();
    assert_eq!(err.to_string(), "stopped at 2");
}

#[test]
fn test_iterate_early_stop_and_callback_error() {
    let mapper = Mapper::<Captures>::new().unwrap();
    let mut seen = Vec::new();
    mapper
        .reader(FOO_BAR_BAZ.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .iterate(|row| {
            seen.push(row.foo);
            Ok(false)
        })
        .unwrap();
    assert_eq!(seen, vec!["Aaa"]);

    let err = mapper
        .reader(FOO_BAR_BAZ.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .iterate(|row| {
            if row.line == 3 {
                return Err("fooey".into());
            }
            Ok(true)
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "line 3: fooey");

    let mut count = 0;
    mapper
        .reader(FOO_BAR_BAZ.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .with_error_handler(|_err: CsvMapError, _line: usize| -> csvmap_io::Result<()> { Ok(()) })
        .iterate(|_row| {
            count += 1;
            Err("ignored".into())
        })
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_post_processor() {
    let mapper = Mapper::<Captures>::new().unwrap();
    let rows = mapper
        .reader(FOO_BAR_BAZ.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .with_post_processor(|row: &mut Captures| {
            row.foo = row.foo.to_lowercase();
            Ok(())
        })
        .read_all()
        .unwrap();
    assert_eq!(rows[0].foo, "aaa");
    assert_eq!(rows[1].foo, "ddd");

    let err = mapper
        .reader(FOO_BAR_BAZ.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .with_post_processor(|row: &mut Captures| {
            if row.line == 2 {
                Err("fooey".into())
            } else {
                Ok(())
            }
        })
        .read()
        .unwrap_err();
    assert_eq!(err.to_string(), "fooey");
}

#[test]
fn test_iterator_impl() {
    let mapper = Mapper::<Captures>::new().unwrap();
    let rows: Vec<Captures> = mapper
        .reader(FOO_BAR_BAZ.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].baz, "Fff");
}

#[derive(Debug, Default, PartialEq)]
pub struct Money(i64);

impl UnmarshalText for Money {
    fn unmarshal_text(text: &str) -> Result<Self, BoxError> {
        let cents = text.trim_start_matches('$').replace('.', "");
        Ok(Money(cents.parse()?))
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Position {
    pub of: usize,
    pub text: String,
}

impl UnmarshalCsv for Position {
    fn unmarshal_csv(value: &str, record: &[String]) -> Result<Self, BoxError> {
        Ok(Position {
            of: record.len(),
            text: value.to_string(),
        })
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct WasQuoted(bool);

impl UnmarshalQuotedCsv for WasQuoted {
    fn unmarshal_quoted_csv(
        _value: &str,
        quoted: bool,
        _record: &[String],
    ) -> Result<Self, BoxError> {
        Ok(WasQuoted(quoted))
    }
}

#[derive(Debug, Default, CsvRecord)]
pub struct Custom {
    pub price: Money,
    pub position: Position,
    pub quoted: WasQuoted,
    pub maybe: Option<WasQuoted>,
}

#[test]
fn test_custom_unmarshalers() {
    let data = "price,position,quoted,maybe\n$1.25,here,\"q\",\"\"\n$x,there,q,\n";
    let mapper = Mapper::<Custom>::new().unwrap();
    let mut reader = mapper.reader(data.as_bytes(), TokenizerOptions::default()).unwrap();

    let row = reader.read().unwrap().unwrap();
    assert_eq!(row.price, Money(125));
    assert_eq!(
        row.position,
        Position {
            of: 4,
            text: "here".to_string()
        }
    );
    assert_eq!(row.quoted, WasQuoted(true));
    assert_eq!(row.maybe, Some(WasQuoted(true)));

    let err = reader.read().unwrap_err();
    assert!(matches!(err, CsvMapError::Custom(_)));
}

#[derive(Debug, Default, CsvRecord)]
pub struct Address {
    pub street: String,
    #[csv("Town")]
    pub town: String,
}

#[derive(Debug, Default, CsvRecord)]
pub struct Audit {
    #[csv("[line]")]
    pub line: i64,
}

#[derive(Debug, Default, CsvRecord)]
pub struct Person {
    pub name: String,
    pub address: Address,
    #[csv(flatten)]
    pub audit: Audit,
    secret: String,
}

#[test]
fn test_nested_and_flattened_records() {
    let data = "name,street,Town\nBilbo,Bagshot Row,Hobbiton\n";
    let mapper = Mapper::<Person>::new().unwrap();
    let row = mapper
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(row.name, "Bilbo");
    assert_eq!(row.address.street, "Bagshot Row");
    assert_eq!(row.address.town, "Hobbiton");
    assert_eq!(row.audit.line, 2);
    assert!(row.secret.is_empty());
}

#[test]
fn test_adapt_rebinds_without_touching_original() {
    let mapper = Mapper::<Person>::new().unwrap();
    let adapted = mapper
        .adapt(
            false,
            &[
                OverrideMapping::name("address.street", "Street"),
                OverrideMapping::index("address.town", 2),
            ],
            None,
        )
        .unwrap();
    let data = "name,town,Street\nSam,Hobbiton,Bagshot Row\n";
    let row = adapted
        .reader(data.as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(row.address.street, "Bagshot Row");
    assert_eq!(row.address.town, "Hobbiton");

    assert_eq!(
        mapper.mappings(),
        vec![
            OverrideMapping::index("name", 1),
            OverrideMapping::index("address.street", 2),
            OverrideMapping::name("address.town", "Town"),
        ]
    );
}

#[test]
fn test_mapper_from_config() {
    let config: MapperConfig = serde_json::from_str(
        r#"{
            "ignore_unknown_field_names": true,
            "clear": true,
            "overrides": [
                {"field": "name", "name": "Who"},
                {"field": "address.town", "index": 1}
            ]
        }"#,
    )
    .unwrap();
    assert!(config.options.ignore_unknown_field_names);

    let mapper = Mapper::<Person>::from_config(&config).unwrap();
    let row = mapper
        .reader("Town,Who\nBree,Barliman\n".as_bytes(), TokenizerOptions::default())
        .unwrap()
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(row.name, "Barliman");
    assert_eq!(row.address.town, "Bree");
    assert!(row.address.street.is_empty());
    assert_eq!(row.audit.line, 2);
}

#[test]
fn test_config_unknown_field() {
    let config = MapperConfig {
        overrides: vec![OverrideMapping::index("nope", 1)],
        ..Default::default()
    };
    let err = Mapper::<Person>::from_config(&config).unwrap_err();
    assert_eq!(err.to_string(), "field \"nope\" not found");
}

#[test]
fn test_plan_shared_across_threads() {
    let mapper = Mapper::<Named>::new().unwrap();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let mapper = mapper.clone();
            std::thread::spawn(move || {
                let data = format!("Name,Age\nn{i},{i}\n");
                let row = mapper
                    .reader(data.as_bytes(), TokenizerOptions::default())
                    .unwrap()
                    .read()
                    .unwrap()
                    .unwrap();
                (row.name, row.age)
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let (name, age) = handle.join().unwrap();
        assert_eq!(name, format!("n{i}"));
        assert_eq!(age, i as i32);
    }
}
