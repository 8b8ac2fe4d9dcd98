//! Date constructor and Date.prototype methods.
//!
//! A date is a UTC time value in milliseconds, clipped to ±8.64e15.
//! Field arithmetic follows the language's own day/time algorithms so it
//! covers the whole range; `chrono` supplies the local zone offset,
//! string parsing and strftime-style rendering.
//!
//! Opcodes come in local/UTC pairs: an even code works in local time and
//! the next odd code in UTC.

use std::fmt::Write as _;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

use crate::call::Call;
use crate::convert;
use crate::error::JsError;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::{Hint, JsValue};

use super::{Builder, Intrinsic, NativeOp};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOp {
    New = 2,
    Utc = 3,
    ValueOf = 4,
    ToString = 6,
    ToUtcString = 7,
    ToIsoString = 8,
    ToUtcIsoString = 9,
    ToIsoDate = 10,
    ToUtcIsoDate = 11,
    ToLocaleString = 12,
    UtcFormat = 13,
    Format = 14,
    Parse = 15,
    GetFullYear = 20,
    GetUtcFullYear = 21,
    GetMonth = 22,
    GetUtcMonth = 23,
    GetDate = 24,
    GetUtcDate = 25,
    GetDay = 26,
    GetUtcDay = 27,
    GetHours = 28,
    GetUtcHours = 29,
    GetMinutes = 30,
    GetUtcMinutes = 31,
    GetSeconds = 32,
    GetUtcSeconds = 33,
    GetMilliseconds = 34,
    GetUtcMilliseconds = 35,
    GetTimezoneOffset = 36,
    SetFullYear = 50,
    SetUtcFullYear = 51,
    SetMonth = 52,
    SetUtcMonth = 53,
    SetDate = 54,
    SetUtcDate = 55,
    SetHours = 56,
    SetUtcHours = 57,
    SetMinutes = 58,
    SetUtcMinutes = 59,
    SetSeconds = 60,
    SetUtcSeconds = 61,
    SetMilliseconds = 62,
    SetUtcMilliseconds = 63,
    GetMonthName = 64,
    GetUtcMonthName = 65,
    SetTime = 66,
}

impl DateOp {
    /// Even opcodes work in local time.
    fn is_local(self) -> bool {
        (self as u16) & 1 == 0
    }
}

const METHODS: &[(&str, u32, DateOp)] = &[
    ("toString", 0, DateOp::ToString),
    ("getTime", 0, DateOp::ValueOf),
    ("valueOf", 0, DateOp::ValueOf),
    ("setTime", 1, DateOp::SetTime),
    ("toUTCString", 0, DateOp::ToUtcString),
    ("toGMTString", 0, DateOp::ToUtcString),
    ("toLocalISO8601", 0, DateOp::ToIsoString),
    ("toISO8601", 0, DateOp::ToUtcIsoString),
    ("toLocalISO8601Date", 0, DateOp::ToIsoDate),
    ("toISO8601Date", 0, DateOp::ToUtcIsoDate),
    ("format", 1, DateOp::Format),
    ("UTCFormat", 1, DateOp::UtcFormat),
    ("toLocaleString", 0, DateOp::ToLocaleString),
    ("getUTCYear", 0, DateOp::GetUtcFullYear),
    ("getUTCFullYear", 0, DateOp::GetUtcFullYear),
    ("getUTCMonth", 0, DateOp::GetUtcMonth),
    ("getUTCMonthName", 0, DateOp::GetUtcMonthName),
    ("getUTCDate", 0, DateOp::GetUtcDate),
    ("getUTCDay", 0, DateOp::GetUtcDay),
    ("getUTCHours", 0, DateOp::GetUtcHours),
    ("getUTCMinutes", 0, DateOp::GetUtcMinutes),
    ("getUTCSeconds", 0, DateOp::GetUtcSeconds),
    ("getUTCMilliseconds", 0, DateOp::GetUtcMilliseconds),
    ("setUTCYear", 1, DateOp::SetUtcFullYear),
    ("setUTCFullYear", 1, DateOp::SetUtcFullYear),
    ("setUTCMonth", 2, DateOp::SetUtcMonth),
    ("setUTCDate", 3, DateOp::SetUtcDate),
    ("setUTCHours", 4, DateOp::SetUtcHours),
    ("setUTCMinutes", 3, DateOp::SetUtcMinutes),
    ("setUTCSeconds", 2, DateOp::SetUtcSeconds),
    ("setUTCMilliseconds", 1, DateOp::SetUtcMilliseconds),
    ("getYear", 0, DateOp::GetFullYear),
    ("getFullYear", 0, DateOp::GetFullYear),
    ("getMonth", 0, DateOp::GetMonth),
    ("getMonthName", 0, DateOp::GetMonthName),
    ("getDate", 0, DateOp::GetDate),
    ("getDay", 0, DateOp::GetDay),
    ("getHours", 0, DateOp::GetHours),
    ("getMinutes", 0, DateOp::GetMinutes),
    ("getSeconds", 0, DateOp::GetSeconds),
    ("getMilliseconds", 0, DateOp::GetMilliseconds),
    ("getTimezoneOffset", 0, DateOp::GetTimezoneOffset),
    ("setYear", 3, DateOp::SetFullYear),
    ("setFullYear", 3, DateOp::SetFullYear),
    ("setMonth", 2, DateOp::SetMonth),
    ("setDate", 1, DateOp::SetDate),
    ("setHours", 4, DateOp::SetHours),
    ("setMinutes", 3, DateOp::SetMinutes),
    ("setSeconds", 2, DateOp::SetSeconds),
    ("setMilliseconds", 1, DateOp::SetMilliseconds),
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub(crate) fn init(b: &Builder) -> Intrinsic {
    let date = b.class(
        "Date",
        7,
        NativeOp::Date(DateOp::New),
        ObjectKind::Date(f64::NAN),
    );
    for &(name, arity, op) in METHODS {
        b.method(&date.prototype, name, arity, NativeOp::Date(op));
    }
    b.method(&date.constructor, "UTC", 7, NativeOp::Date(DateOp::Utc));
    b.method(&date.constructor, "parse", 1, NativeOp::Date(DateOp::Parse));
    date
}

// ============ TIME ARITHMETIC ============

const MS_PER_DAY: f64 = 86_400_000.0;
const MAX_TIME: f64 = 8.64e15;

/// Clip to the representable range; out of range is NaN.
pub fn time_clip(t: f64) -> f64 {
    if !t.is_finite() || t.abs() > MAX_TIME {
        return f64::NAN;
    }
    convert::to_integer(t) + 0.0
}

fn day(t: f64) -> f64 {
    (t / MS_PER_DAY).floor()
}

fn time_within_day(t: f64) -> f64 {
    t.rem_euclid(MS_PER_DAY)
}

fn day_from_year(y: f64) -> f64 {
    365.0 * (y - 1970.0) + ((y - 1969.0) / 4.0).floor() - ((y - 1901.0) / 100.0).floor()
        + ((y - 1601.0) / 400.0).floor()
}

fn time_from_year(y: f64) -> f64 {
    MS_PER_DAY * day_from_year(y)
}

fn is_leap(y: f64) -> bool {
    (y % 4.0 == 0.0 && y % 100.0 != 0.0) || y % 400.0 == 0.0
}

fn year_from_time(t: f64) -> f64 {
    let mut y = (t / (MS_PER_DAY * 365.2425)).floor() + 1970.0;
    while time_from_year(y) > t {
        y -= 1.0;
    }
    while time_from_year(y + 1.0) <= t {
        y += 1.0;
    }
    y
}

/// Day of the year on which each month starts
fn month_start(month: usize, leap: bool) -> f64 {
    const STARTS: [f64; 13] = [
        0.0, 31.0, 59.0, 90.0, 120.0, 151.0, 181.0, 212.0, 243.0, 273.0, 304.0, 334.0, 365.0,
    ];
    let start = STARTS.get(month).copied().unwrap_or(365.0);
    if leap && month >= 2 { start + 1.0 } else { start }
}

/// `(month, date)` of `t`, month 0-based and date 1-based
fn month_and_date(t: f64) -> (f64, f64) {
    let y = year_from_time(t);
    let leap = is_leap(y);
    let in_year = day(t) - day_from_year(y);
    let month = (0..12)
        .rev()
        .find(|&m| in_year >= month_start(m, leap))
        .unwrap_or(0);
    (month as f64, in_year - month_start(month, leap) + 1.0)
}

fn week_day(t: f64) -> f64 {
    (day(t) + 4.0).rem_euclid(7.0)
}

pub fn make_time(hour: f64, min: f64, sec: f64, ms: f64) -> f64 {
    if ![hour, min, sec, ms].iter().all(|n| n.is_finite()) {
        return f64::NAN;
    }
    convert::to_integer(hour) * 3_600_000.0
        + convert::to_integer(min) * 60_000.0
        + convert::to_integer(sec) * 1_000.0
        + convert::to_integer(ms)
}

pub fn make_day(year: f64, month: f64, date: f64) -> f64 {
    if ![year, month, date].iter().all(|n| n.is_finite()) {
        return f64::NAN;
    }
    let (year, month, date) = (
        convert::to_integer(year),
        convert::to_integer(month),
        convert::to_integer(date),
    );
    let y = year + (month / 12.0).floor();
    let m = month.rem_euclid(12.0) as usize;
    day_from_year(y) + month_start(m, is_leap(y)) + date - 1.0
}

pub fn make_date(day: f64, time: f64) -> f64 {
    if !day.is_finite() || !time.is_finite() {
        return f64::NAN;
    }
    day * MS_PER_DAY + time
}

/// Offset of local time from UTC at UTC time `t`, in milliseconds
fn local_offset(t: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    DateTime::<Utc>::from_timestamp_millis(t as i64)
        .map(|dt| Local.offset_from_utc_datetime(&dt.naive_utc()).fix().local_minus_utc())
        .map_or(0.0, |seconds| f64::from(seconds) * 1000.0)
}

fn local_time(t: f64) -> f64 {
    t + local_offset(t)
}

fn utc_time(local: f64) -> f64 {
    let guess = local - local_offset(local);
    local - local_offset(guess)
}

/// Broken-down time for one realm.
///
/// Loaded from a time value in local time or UTC, edited field by field,
/// then recomposed with overflow normalized the way the setters need.
#[derive(Debug, Default, Clone)]
pub(crate) struct Calendar {
    year: f64,
    month: f64,
    date: f64,
    hours: f64,
    minutes: f64,
    seconds: f64,
    millis: f64,
    week_day: f64,
    local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Year,
    Month,
    Date,
    Hours,
    Minutes,
    Seconds,
    Millis,
    /// Day of the week; read-only
    WeekDay,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Break down UTC time `t`, in local time when `local` is set.
    fn load(&mut self, t: f64, local: bool) {
        let t = if local { local_time(t) } else { t };
        let (month, date) = month_and_date(t);
        let within = time_within_day(t);
        self.year = year_from_time(t);
        self.month = month;
        self.date = date;
        self.hours = (within / 3_600_000.0).floor();
        self.minutes = (within / 60_000.0).floor() % 60.0;
        self.seconds = (within / 1_000.0).floor() % 60.0;
        self.millis = within % 1_000.0;
        self.week_day = week_day(t);
        self.local = local;
    }

    fn get(&self, field: Field) -> f64 {
        match field {
            Field::Year => self.year,
            Field::Month => self.month,
            Field::Date => self.date,
            Field::Hours => self.hours,
            Field::Minutes => self.minutes,
            Field::Seconds => self.seconds,
            Field::Millis => self.millis,
            Field::WeekDay => self.week_day,
        }
    }

    fn set(&mut self, field: Field, value: f64) {
        let slot = match field {
            Field::Year => &mut self.year,
            Field::Month => &mut self.month,
            Field::Date => &mut self.date,
            Field::Hours => &mut self.hours,
            Field::Minutes => &mut self.minutes,
            Field::Seconds => &mut self.seconds,
            Field::Millis => &mut self.millis,
            Field::WeekDay => return,
        };
        *slot = value;
    }

    /// The UTC time value the fields describe, clipped
    fn time(&self) -> f64 {
        let t = make_date(
            make_day(self.year, self.month, self.date),
            make_time(self.hours, self.minutes, self.seconds, self.millis),
        );
        time_clip(if self.local { utc_time(t) } else { t })
    }
}

// ============ RENDERING AND PARSING ============

/// Render `t` with a strftime pattern; an invalid pattern is a RangeError.
fn render(t: f64, local: bool, pattern: &str) -> Result<String, JsError> {
    let Some(utc) = DateTime::<Utc>::from_timestamp_millis(t as i64) else {
        return Ok("Invalid Date".to_string());
    };
    let mut out = String::new();
    let written = if local {
        write!(out, "{}", utc.with_timezone(&Local).format(pattern))
    } else {
        write!(out, "{}", utc.format(pattern))
    };
    written.map_err(|_| JsError::range_error(format!("invalid date format `{}'", pattern)))?;
    Ok(out)
}

fn iso_pattern(t: f64, local: bool) -> &'static str {
    match (t % 1000.0 != 0.0, local) {
        (true, true) => "%Y-%m-%dT%H:%M:%S%.3f%:z",
        (true, false) => "%Y-%m-%dT%H:%M:%S%.3fZ",
        (false, true) => "%Y-%m-%dT%H:%M:%S%:z",
        (false, false) => "%Y-%m-%dT%H:%M:%SZ",
    }
}

/// `Date.parse`: RFC 2822, RFC 3339 and a few ISO-like layouts. Strings
/// without a zone are read as UTC.
pub fn parse(text: &str) -> f64 {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return time_clip(dt.timestamp_millis() as f64);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return time_clip(dt.timestamp_millis() as f64);
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%a, %d %b %Y %H:%M:%S %z") {
        return time_clip(dt.timestamp_millis() as f64);
    }
    for layout in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%a %b %d %H:%M:%S %Y",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
            return time_clip(dt.and_utc().timestamp_millis() as f64);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return time_clip(dt.and_utc().timestamp_millis() as f64);
        }
    }
    f64::NAN
}

// ============ NATIVES ============

pub(crate) fn call(op: DateOp, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    match op {
        DateOp::New => {
            let now = call.realm()?.now_millis();
            Ok(JsValue::from(render(now, true, "%a, %d %b %Y %H:%M:%S %z")?))
        }
        DateOp::Utc => Ok(JsValue::Number(compose(call, argc, false)?)),
        DateOp::Parse => Ok(JsValue::Number(parse(call.arg_string(0, argc)?.as_str()))),
        DateOp::ValueOf => Ok(JsValue::Number(this_date(call, "valueOf")?.1)),
        DateOp::SetTime => {
            let (obj, _) = this_date(call, "setTime")?;
            let t = time_clip(call.arg_number(0, argc)?);
            store(&obj, t);
            Ok(JsValue::Number(t))
        }
        DateOp::GetTimezoneOffset => {
            let (_, t) = this_date(call, "getTimezoneOffset")?;
            if t.is_nan() {
                return Ok(JsValue::Number(f64::NAN));
            }
            Ok(JsValue::Number((t - local_time(t)) / 60_000.0))
        }
        DateOp::ToString
        | DateOp::ToUtcString
        | DateOp::ToIsoString
        | DateOp::ToUtcIsoString
        | DateOp::ToIsoDate
        | DateOp::ToUtcIsoDate
        | DateOp::ToLocaleString
        | DateOp::Format
        | DateOp::UtcFormat => to_string(op, call, argc),
        DateOp::GetMonthName | DateOp::GetUtcMonthName => {
            let (_, t) = this_date(call, "getMonthName")?;
            if t.is_nan() {
                return Ok(JsValue::Number(f64::NAN));
            }
            let month = broken_down(call, t, op.is_local())?.month as usize;
            Ok(JsValue::from(MONTH_NAMES.get(month).copied().unwrap_or("")))
        }
        _ => match getter_field(op) {
            Some(field) => get(op, field, call),
            None => set(op, call, argc),
        },
    }
}

/// `new Date(...)`
pub(crate) fn construct(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let realm = call.realm()?;
    let t = match argc {
        0 => time_clip(realm.now_millis().floor()),
        1 => match call.arg(0).to_primitive(Hint::Default)? {
            JsValue::String(s) => parse(s.as_str()),
            other => time_clip(other.to_number()?),
        },
        _ => compose(call, argc, true)?,
    };
    Ok(JsValue::Object(realm.create_date(t)))
}

/// Time value from `(year, month[, date, hours, minutes, seconds, ms])`
fn compose(call: &Call, argc: usize, local: bool) -> Result<f64, JsError> {
    if argc < 2 {
        return Ok(f64::NAN);
    }
    let field = |i: usize, default: f64| -> Result<f64, JsError> {
        if i < argc {
            call.arg(i as isize).to_number()
        } else {
            Ok(default)
        }
    };
    let mut year = field(0, f64::NAN)?;
    if year.is_finite() {
        let whole = convert::to_integer(year);
        if (0.0..=99.0).contains(&whole) {
            year = 1900.0 + whole;
        }
    }
    let t = make_date(
        make_day(year, field(1, 0.0)?, field(2, 1.0)?),
        make_time(field(3, 0.0)?, field(4, 0.0)?, field(5, 0.0)?, field(6, 0.0)?),
    );
    Ok(time_clip(if local { utc_time(t) } else { t }))
}

fn this_date(call: &Call, method: &str) -> Result<(ObjectRef, f64), JsError> {
    let incompatible = || {
        JsError::type_error(format!(
            "Date.prototype.{} called on incompatible object",
            method
        ))
    };
    let JsValue::Object(obj) = call.this_value() else {
        return Err(incompatible());
    };
    let time = match &obj.borrow().kind {
        ObjectKind::Date(t) => *t,
        _ => return Err(incompatible()),
    };
    Ok((obj, time))
}

fn store(obj: &ObjectRef, t: f64) {
    obj.borrow_mut().kind = ObjectKind::Date(t);
}

/// Break `t` down in the realm's calendar and return a copy.
fn broken_down(call: &Call, t: f64, local: bool) -> Result<Calendar, JsError> {
    let mut calendar = call.realm()?.calendar().lock();
    calendar.load(t, local);
    Ok(calendar.clone())
}

fn getter_field(op: DateOp) -> Option<Field> {
    Some(match op {
        DateOp::GetFullYear | DateOp::GetUtcFullYear => Field::Year,
        DateOp::GetMonth | DateOp::GetUtcMonth => Field::Month,
        DateOp::GetDate | DateOp::GetUtcDate => Field::Date,
        DateOp::GetDay | DateOp::GetUtcDay => Field::WeekDay,
        DateOp::GetHours | DateOp::GetUtcHours => Field::Hours,
        DateOp::GetMinutes | DateOp::GetUtcMinutes => Field::Minutes,
        DateOp::GetSeconds | DateOp::GetUtcSeconds => Field::Seconds,
        DateOp::GetMilliseconds | DateOp::GetUtcMilliseconds => Field::Millis,
        _ => return None,
    })
}

fn get(op: DateOp, field: Field, call: &Call) -> Result<JsValue, JsError> {
    let (_, t) = this_date(call, "get")?;
    if t.is_nan() {
        return Ok(JsValue::Number(f64::NAN));
    }
    Ok(JsValue::Number(broken_down(call, t, op.is_local())?.get(field)))
}

/// The fields a setter assigns from its arguments, in order
fn setter_fields(op: DateOp) -> &'static [Field] {
    const ALL: [Field; 7] = [
        Field::Year,
        Field::Month,
        Field::Date,
        Field::Hours,
        Field::Minutes,
        Field::Seconds,
        Field::Millis,
    ];
    let (start, end) = match op {
        DateOp::SetFullYear | DateOp::SetUtcFullYear => (0, 3),
        DateOp::SetMonth | DateOp::SetUtcMonth => (1, 3),
        DateOp::SetDate | DateOp::SetUtcDate => (2, 3),
        DateOp::SetHours | DateOp::SetUtcHours => (3, 7),
        DateOp::SetMinutes | DateOp::SetUtcMinutes => (4, 7),
        DateOp::SetSeconds | DateOp::SetUtcSeconds => (5, 7),
        DateOp::SetMilliseconds | DateOp::SetUtcMilliseconds => (6, 7),
        _ => (0, 0),
    };
    ALL.get(start..end).unwrap_or(&[])
}

fn set(op: DateOp, call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let fields = setter_fields(op);
    let (obj, t) = this_date(call, "set")?;
    if fields.is_empty() {
        return Err(JsError::internal_error(format!("unknown Date opcode {}", op as u16)));
    }
    let is_year = matches!(op, DateOp::SetFullYear | DateOp::SetUtcFullYear);
    let base = if t.is_nan() && is_year { 0.0 } else { t };
    if base.is_nan() || argc == 0 {
        return Ok(JsValue::Number(f64::NAN));
    }

    let mut values = Vec::with_capacity(fields.len());
    for (i, _) in fields.iter().enumerate().take(argc) {
        values.push(call.arg(i as isize).to_number()?);
    }
    let updated = {
        let mut calendar = call.realm()?.calendar().lock();
        calendar.load(base, op.is_local());
        for (field, value) in fields.iter().zip(values) {
            calendar.set(*field, value);
        }
        calendar.time()
    };
    store(&obj, updated);
    Ok(JsValue::Number(updated))
}

fn to_string(op: DateOp, call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let (_, t) = this_date(call, "toString")?;
    if t.is_nan() {
        return Ok(JsValue::Number(f64::NAN));
    }
    let local = op.is_local();
    let pattern = match op {
        DateOp::ToString => "%a, %d %b %Y %H:%M:%S %z".to_string(),
        DateOp::ToUtcString => "%a, %d %b %Y %H:%M:%S GMT".to_string(),
        DateOp::ToIsoString | DateOp::ToUtcIsoString => iso_pattern(t, local).to_string(),
        DateOp::ToIsoDate | DateOp::ToUtcIsoDate => "%Y-%m-%d".to_string(),
        DateOp::ToLocaleString => "%a %b %d %H:%M:%S %Y".to_string(),
        _ => match call.get_arg(0, argc) {
            JsValue::Undefined => String::new(),
            other => other.to_js_string()?.to_string(),
        },
    };
    Ok(JsValue::from(render(t, local, &pattern)?))
}
