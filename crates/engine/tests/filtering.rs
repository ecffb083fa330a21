use chrono::NaiveDate;

use engine::{
    CellEditor, CellValue, Commit, Currency, Filters, Invoice, MethodFilter, Money, StatusFilter,
    filter, paid_in_month_of,
};

fn invoice(row: i64, name: &str, reference: &str, valor: &str, ultimo: &str, metodo: &str) -> Invoice {
    Invoice {
        row,
        name: name.to_string(),
        reference: reference.to_string(),
        amount: Money::parse_digits(valor).unwrap_or_default(),
        last_paid: ultimo.to_string(),
        method: metodo.to_string(),
    }
}

fn household() -> Vec<Invoice> {
    vec![
        invoice(2, "Agua", "ACU-2231", "50.000", "3/5/2024", ""),
        invoice(3, "Energía", "EPM-8812", "$ 182.300", "28/4/2024 10:15", "Nequi"),
        invoice(4, "Internet", "CLARO-77", "99900", "15/5/2024", "Nequi"),
        invoice(5, "Gas natural", "VANTI-1", "38.450", "", "Daviplata"),
        invoice(6, "Administración", "ADM-APTO", "410.000", "1/5/2023", "Efectivo"),
        invoice(7, "Celular", "MOV-555", "", "5/2024", "Nequi"),
    ]
}

fn all_filter_combinations() -> Vec<Filters> {
    let mut combos = Vec::new();
    for status in [StatusFilter::All, StatusFilter::Paid, StatusFilter::Pending] {
        for method in [
            MethodFilter::All,
            MethodFilter::Exact("Nequi".to_string()),
            MethodFilter::Exact("Efectivo".to_string()),
            MethodFilter::Exact("Sin método".to_string()),
        ] {
            for query in ["", "a", "NET", "epm", "zzz"] {
                combos.push(Filters {
                    query: query.to_string(),
                    status,
                    method: method.clone(),
                });
            }
        }
    }
    combos
}

fn may_2024() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
}

#[test]
fn filtered_list_is_an_ordered_subset() {
    let list = household();
    for filters in all_filter_combinations() {
        let out = filter(&list, &filters, may_2024());
        let mut cursor = list.iter();
        for kept in &out {
            assert!(
                cursor.any(|candidate| candidate == kept),
                "row {} out of order or foreign for {filters:?}",
                kept.row
            );
        }
    }
}

#[test]
fn filtering_is_idempotent() {
    let list = household();
    for filters in all_filter_combinations() {
        let once = filter(&list, &filters, may_2024());
        let twice = filter(&once, &filters, may_2024());
        assert_eq!(once, twice, "{filters:?}");
    }
}

#[test]
fn paid_scenario_in_may_2024() {
    let list = vec![invoice(1, "Agua", "", "50.000", "3/5/2024", "")];
    assert_eq!(list[0].amount, Money::new(50_000));

    let paid = Filters {
        status: StatusFilter::Paid,
        ..Filters::default()
    };
    let pending = Filters {
        status: StatusFilter::Pending,
        ..Filters::default()
    };
    assert_eq!(filter(&list, &paid, may_2024()).len(), 1);
    assert!(filter(&list, &pending, may_2024()).is_empty());
}

#[test]
fn short_dates_are_never_paid() {
    for date in ["", "3", "3/5", "5/2024", "3-5-2024", "3/5 2024"] {
        assert!(!paid_in_month_of(date, may_2024()), "{date:?}");
    }
}

#[test]
fn format_parse_round_trip() {
    let mut value = 0i64;
    while value < 10_000_000_000 {
        let money = Money::new(value);
        assert_eq!(Money::parse_digits(&money.format(Currency::Cop)), Some(money));
        value = value * 7 + 3;
    }
}

#[test]
fn amount_edit_scenario() {
    let mut cell = CellEditor::new(1, CellValue::Amount(Money::new(50_000)), Currency::Cop);
    cell.begin();
    assert_eq!(cell.text(), "50000");
    assert!(!cell.text().contains('$') && !cell.text().contains('.'));

    for _ in 0.."50000".len() {
        cell.backspace();
    }
    cell.input("75.000");
    match cell.commit() {
        Commit::Save { row, value } => {
            assert_eq!(row, 1);
            assert_eq!(value, CellValue::Amount(Money::new(75_000)));
            assert_eq!(value.display(Currency::Cop), "$\u{a0}75.000");
        }
        other => panic!("unexpected commit {other:?}"),
    }
}
