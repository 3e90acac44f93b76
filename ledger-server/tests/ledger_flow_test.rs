//! 台账端到端流程测试
//!
//! 使用 ServerState::initialize 完整初始化，覆盖一个入学从注册到结清的
//! 完整生命周期：首付、支票两阶段、退票重付、差额结转，以及重启后的
//! 状态恢复。

use chrono::NaiveDate;
use ledger_server::{Config, LedgerManager, ServerState};
use shared::ledger::{
    AdmissionInput, ClearanceDecision, CommandResponse, InstallmentScheduleInput,
    InstallmentStatus, LedgerCommand, LedgerCommandPayload, PaymentInput, PaymentMethod,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 30000 总费用: 首付 6000 + 3 期 × 8000
fn admission_input() -> AdmissionInput {
    AdmissionInput {
        student_id: "student-42".to_string(),
        student_name: "Asha Verma".to_string(),
        course: "Data Science Diploma".to_string(),
        base_fees: 30000.0,
        discount_amount: 0.0,
        cgst_amount: 0.0,
        sgst_amount: 0.0,
        total_fees: 30000.0,
        down_payment: 6000.0,
        installments: vec![
            InstallmentScheduleInput {
                due_date: day(2025, 2, 10),
                amount: 8000.0,
            },
            InstallmentScheduleInput {
                due_date: day(2025, 3, 10),
                amount: 8000.0,
            },
            InstallmentScheduleInput {
                due_date: day(2025, 4, 10),
                amount: 8000.0,
            },
        ],
    }
}

fn payment(amount: f64, method: PaymentMethod) -> PaymentInput {
    PaymentInput {
        paid_amount: amount,
        payment_method: method,
        transaction_id: Some("TXN-1".to_string()),
        cheque_number: None,
        cheque_date: None,
        bank_name: None,
        received_date: day(2025, 1, 15),
        carry_forward: false,
        remarks: None,
    }
}

fn cheque_payment(amount: f64) -> PaymentInput {
    PaymentInput {
        paid_amount: amount,
        payment_method: PaymentMethod::Cheque,
        transaction_id: None,
        cheque_number: Some("CHQ778899".to_string()),
        cheque_date: Some(day(2025, 2, 1)),
        bank_name: Some("SBI".to_string()),
        received_date: day(2025, 2, 1),
        carry_forward: false,
        remarks: None,
    }
}

fn command(payload: LedgerCommandPayload) -> LedgerCommand {
    LedgerCommand::new("op-1".to_string(), "Front Desk".to_string(), payload)
}

fn must_succeed(response: CommandResponse) -> CommandResponse {
    assert!(
        response.success,
        "command failed: {:?}",
        response.error
    );
    response
}

#[tokio::test]
async fn full_admission_lifecycle_with_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_overrides(dir.path().to_str().unwrap(), 0);

    let admission_id;
    {
        let state = ServerState::initialize(&config).await;
        let manager = state.manager();

        // 注册
        let response = must_succeed(manager.execute_command(command(
            LedgerCommandPayload::RegisterAdmission {
                admission: admission_input(),
            },
        )));
        admission_id = response.admission_id.expect("registration assigns an id");

        let snapshot = manager.get_snapshot(&admission_id).unwrap().unwrap();
        assert_eq!(snapshot.installments.len(), 4);
        assert_eq!(snapshot.version, 1);
        assert!(snapshot.admission_number.starts_with("ADM"));

        // 首付: 现金 6000
        must_succeed(manager.execute_command(command(
            LedgerCommandPayload::RecordPayment {
                admission_id: admission_id.clone(),
                installment_number: 0,
                payment: payment(6000.0, PaymentMethod::Cash),
            },
        )));

        // 第 1 期: 支票 8000, 银行过账
        must_succeed(manager.execute_command(command(
            LedgerCommandPayload::RecordPayment {
                admission_id: admission_id.clone(),
                installment_number: 1,
                payment: cheque_payment(8000.0),
            },
        )));

        let snapshot = manager.get_snapshot(&admission_id).unwrap().unwrap();
        let first = snapshot.installment(1).unwrap();
        assert_eq!(first.status, InstallmentStatus::PendingClearance);
        // 未清算的支票不算收款
        assert_eq!(snapshot.total_paid(), 6000.0);

        must_succeed(manager.execute_command(command(
            LedgerCommandPayload::ResolveClearance {
                admission_id: admission_id.clone(),
                installment_number: 1,
                decision: ClearanceDecision::Approve,
                remark: None,
            },
        )));

        let snapshot = manager.get_snapshot(&admission_id).unwrap().unwrap();
        assert_eq!(snapshot.installment(1).unwrap().status, InstallmentStatus::Paid);
        assert_eq!(snapshot.total_paid(), 14000.0);

        // 第 2 期: 支票退票, 重新以 UPI 部分支付并结转差额
        must_succeed(manager.execute_command(command(
            LedgerCommandPayload::RecordPayment {
                admission_id: admission_id.clone(),
                installment_number: 2,
                payment: cheque_payment(8000.0),
            },
        )));
        must_succeed(manager.execute_command(command(
            LedgerCommandPayload::ResolveClearance {
                admission_id: admission_id.clone(),
                installment_number: 2,
                decision: ClearanceDecision::Reject,
                remark: Some("Insufficient funds".to_string()),
            },
        )));

        let snapshot = manager.get_snapshot(&admission_id).unwrap().unwrap();
        let second = snapshot.installment(2).unwrap();
        assert_eq!(second.status, InstallmentStatus::Pending);
        assert_eq!(second.paid_amount, 0.0);

        let mut short = payment(3000.0, PaymentMethod::Upi);
        short.carry_forward = true;
        must_succeed(manager.execute_command(command(
            LedgerCommandPayload::RecordPayment {
                admission_id: admission_id.clone(),
                installment_number: 2,
                payment: short,
            },
        )));

        let snapshot = manager.get_snapshot(&admission_id).unwrap().unwrap();
        let second = snapshot.installment(2).unwrap();
        assert_eq!(second.status, InstallmentStatus::Paid);
        assert_eq!(second.amount, 3000.0);
        // 差额转入第 3 期, 计划总额不变
        let third = snapshot.installment(3).unwrap();
        assert_eq!(third.amount, 13000.0);
        let schedule_total: f64 = snapshot.installments.iter().map(|i| i.amount).sum();
        assert_eq!(schedule_total, 30000.0);

        // 第 3 期: 银行转账结清
        must_succeed(manager.execute_command(command(
            LedgerCommandPayload::RecordPayment {
                admission_id: admission_id.clone(),
                installment_number: 3,
                payment: payment(13000.0, PaymentMethod::BankTransfer),
            },
        )));

        let snapshot = manager.get_snapshot(&admission_id).unwrap().unwrap();
        assert!(snapshot.is_fully_paid());
        assert_eq!(snapshot.total_paid(), 30000.0);
        assert_eq!(snapshot.remaining_amount(), 0.0);

        // 历史覆盖全部事件: 注册不产生条目, 其余每条命令一条
        let history = manager.get_payment_history(&admission_id).unwrap();
        assert_eq!(history.len(), 7);

        // 学生汇总
        let summary = manager.get_student_summary("student-42").unwrap();
        assert_eq!(summary.total_admissions, 1);
        assert_eq!(summary.total_fees, 30000.0);
        assert_eq!(summary.total_paid, 30000.0);
        assert_eq!(summary.total_remaining, 0.0);
    }

    // 重启: 重新打开同一数据库, 状态必须完整恢复
    let manager = LedgerManager::new(config.database_path(), chrono_tz::Asia::Kolkata).unwrap();
    let snapshot = manager.get_snapshot(&admission_id).unwrap().unwrap();
    assert!(snapshot.is_fully_paid());
    assert_eq!(snapshot.total_paid(), 30000.0);

    // 事件重放重建必须与存储的快照一致
    let rebuilt = manager.rebuild_snapshot(&admission_id).unwrap();
    assert_eq!(rebuilt.installments, snapshot.installments);
    assert_eq!(rebuilt.state_checksum, snapshot.state_checksum);
    assert!(manager.verify_snapshot(&admission_id).unwrap());
}

#[tokio::test]
async fn concurrency_token_guards_interleaved_writes() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_overrides(dir.path().to_str().unwrap(), 0);
    let state = ServerState::initialize(&config).await;
    let manager = state.manager();

    let response = must_succeed(manager.execute_command(command(
        LedgerCommandPayload::RegisterAdmission {
            admission: admission_input(),
        },
    )));
    let admission_id = response.admission_id.unwrap();

    // 两个操作员读到同一版本
    let version = manager.get_snapshot(&admission_id).unwrap().unwrap().version;

    let first = command(LedgerCommandPayload::RecordPayment {
        admission_id: admission_id.clone(),
        installment_number: 0,
        payment: payment(3000.0, PaymentMethod::Cash),
    })
    .with_expected_version(version);
    must_succeed(manager.execute_command(first));

    // 第二个带过期令牌的命令必须失败且不改变状态
    let stale = command(LedgerCommandPayload::RecordPayment {
        admission_id: admission_id.clone(),
        installment_number: 0,
        payment: payment(3000.0, PaymentMethod::Cash),
    })
    .with_expected_version(version);
    let response = manager.execute_command(stale);
    assert!(!response.success);

    let snapshot = manager.get_snapshot(&admission_id).unwrap().unwrap();
    assert_eq!(snapshot.installment(0).unwrap().paid_amount, 3000.0);
}
