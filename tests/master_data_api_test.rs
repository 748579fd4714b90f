// ==========================================
// 主数据 / 作业 API 集成测试
// ==========================================
// 测试目标: 重名冲突提示、错误本地化、车次人工维护落库
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use smart_calda::api::{ApiError, TripGenerationRequest};
use smart_calda::domain::master_data::Truck;
use smart_calda::domain::operation::ServiceOrderLine;
use smart_calda::domain::types::{Shift, TripStatus};
use smart_calda::i18n::set_locale;
use test_helpers::create_test_state;

#[test]
fn test_duplicate_driver_offers_edit_of_existing_record() {
    let (_temp_file, state) = create_test_state();
    let api = &state.master_data_api;

    let existing = api.create_driver("José Carlos", Shift::TurnoB).unwrap();
    let err = api.create_driver("jose carlos", Shift::TurnoA).unwrap_err();

    match &err {
        ApiError::DuplicateNameConflict { existing_id, .. } => assert_eq!(existing_id, &existing.id),
        other => panic!("unexpected error: {other}"),
    }

    set_locale("pt-BR");
    assert!(err.user_message().contains("já está cadastrado"));
}

#[test]
fn test_truck_and_supervisor_crud() {
    let (_temp_file, state) = create_test_state();
    let api = &state.master_data_api;

    let truck = api
        .create_truck(Truck {
            id: "qwe4r56".to_string(),
            max_capacity: 12000.0,
            company: "Transportadora".to_string(),
        })
        .unwrap();
    assert_eq!(truck.id, "QWE4R56");

    let mut bigger = truck.clone();
    bigger.max_capacity = 15000.0;
    api.update_truck(bigger).unwrap();
    assert_eq!(api.list_trucks().unwrap()[0].max_capacity, 15000.0);

    let supervisor = api.create_supervisor("Márcio Lima", "Frente 2").unwrap();
    assert!(api.delete_supervisor(&supervisor.id).unwrap());
    assert!(api.list_supervisors().unwrap().is_empty());

    let missing = Truck {
        id: "NAO0E00".to_string(),
        max_capacity: 1.0,
        company: String::new(),
    };
    assert!(matches!(api.update_truck(missing), Err(ApiError::NotFound(_))));
}

#[test]
fn test_trip_edits_are_persisted() {
    let (_temp_file, state) = create_test_state();
    let api = &state.operation_api;

    let mut draft = ServiceOrderLine::new("", "410001");
    draft.operation_number = "15".to_string();
    let saved = api.save_operation(draft).unwrap();
    assert!(saved.id.starts_with("410001-"));

    let line = api
        .generate_trips(&TripGenerationRequest {
            operation_id: saved.id.clone(),
            total_volume: 10000.05,
            tank_capacity: 5000.0,
            delivery_date: NaiveDate::from_ymd_opt(2024, 6, 3),
            delivery_shift: Some(Shift::TurnoA),
            confirmed: false,
        })
        .unwrap();
    let liters: Vec<f64> = line.volumes.iter().map(|t| t.liters).collect();
    assert_eq!(liters, vec![5000.0, 5000.0], "residue below 0.1 L is dropped");

    let trip_id = line.volumes[1].id.clone();
    api.toggle_trip_status(&saved.id, &trip_id).unwrap();
    api.update_trip_date(&saved.id, &trip_id, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap())
        .unwrap();

    let stored = api.get_operation(&saved.id).unwrap();
    assert_eq!(stored.volumes[1].status, TripStatus::Delivered);
    assert_eq!(stored.volumes[1].delivery_date, NaiveDate::from_ymd_opt(2024, 6, 4));
    assert_eq!(stored.volumes[0].status, TripStatus::Available);
}

#[test]
fn test_invalid_capacity_is_rejected_without_writing() {
    let (_temp_file, state) = create_test_state();
    let api = &state.operation_api;

    let mut draft = ServiceOrderLine::new("", "410002");
    draft.operation_number = "15".to_string();
    let saved = api.save_operation(draft).unwrap();

    let err = api
        .generate_trips(&TripGenerationRequest {
            operation_id: saved.id.clone(),
            total_volume: 1000.0,
            tank_capacity: 0.0,
            delivery_date: NaiveDate::from_ymd_opt(2024, 6, 3),
            delivery_shift: Some(Shift::TurnoA),
            confirmed: false,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidPartitionInput(_)));
    assert!(api.get_operation(&saved.id).unwrap().volumes.is_empty());
}
