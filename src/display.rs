use crate::error::StoreResult;
use crate::manager::{
    DashboardFilter, NameFilter, RollCallQuery, RosterManager, StudentFilter,
};
use crate::models::Weekday;
use chrono::{NaiveDate, NaiveTime};
use tabled::{Table, Tabled, settings::Style};

fn render<T: Tabled>(rows: Vec<T>) -> Table {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table
}

fn time_range(start: NaiveTime, end: NaiveTime) -> String {
    format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
}

fn dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn state(active: bool) -> &'static str {
    if active { "active" } else { "archived" }
}

/// Pretty prints the schools matching `filter`.
pub fn show_schools(manager: &mut RosterManager, filter: &NameFilter) -> StoreResult<()> {
    #[derive(Tabled)]
    struct SchoolLine {
        id: i32,
        name: String,
        state: &'static str,
    }

    let lines: Vec<SchoolLine> = manager
        .schools(filter)?
        .into_iter()
        .map(|school| SchoolLine {
            id: school.id,
            name: school.name,
            state: state(school.active),
        })
        .collect();

    println!("Schools:\n{}", render(lines));
    Ok(())
}

/// Pretty prints the diagnoses matching `filter`.
pub fn show_diagnoses(manager: &mut RosterManager, filter: &NameFilter) -> StoreResult<()> {
    #[derive(Tabled)]
    struct DiagnosisLine {
        id: i32,
        name: String,
        code: String,
        state: &'static str,
    }

    let lines: Vec<DiagnosisLine> = manager
        .diagnoses(filter)?
        .into_iter()
        .map(|diagnosis| DiagnosisLine {
            id: diagnosis.id,
            code: dash(diagnosis.code.as_deref()),
            name: diagnosis.name,
            state: state(diagnosis.active),
        })
        .collect();

    println!("Diagnoses:\n{}", render(lines));
    Ok(())
}

/// Pretty prints the therapies matching `filter`.
pub fn show_therapies(manager: &mut RosterManager, filter: &NameFilter) -> StoreResult<()> {
    #[derive(Tabled)]
    struct TherapyLine {
        id: i32,
        name: String,
        code: String,
        color: String,
        state: &'static str,
    }

    let lines: Vec<TherapyLine> = manager
        .therapies(filter)?
        .into_iter()
        .map(|therapy| TherapyLine {
            id: therapy.id,
            code: dash(therapy.code.as_deref()),
            color: therapy.color.code().to_string(),
            name: therapy.name,
            state: state(therapy.active),
        })
        .collect();

    println!("Therapies:\n{}", render(lines));
    Ok(())
}

/// Pretty prints the students matching `filter`.
pub fn show_students(manager: &mut RosterManager, filter: &StudentFilter) -> StoreResult<()> {
    #[derive(Tabled)]
    struct StudentLine {
        id: i32,
        number: i32,
        name: String,
        school: String,
        grade: String,
        diagnosis: String,
        transport: &'static str,
    }

    let lines: Vec<StudentLine> = manager
        .students(filter)?
        .into_iter()
        .map(|row| StudentLine {
            id: row.student.id,
            number: row.student.enrollment_number,
            grade: row.student.grade.to_string(),
            transport: if row.student.transport { "yes" } else { "no" },
            name: row.student.full_name,
            school: row.school,
            diagnosis: dash(row.diagnosis.as_deref()),
        })
        .collect();

    let heading = if filter.archived { "Archived students" } else { "Students" };
    println!("{heading}:\n{}", render(lines));
    Ok(())
}

/// Prints all info about a student, including their weekly sessions and how many sessions they
/// attended, were excused from, and missed.
pub fn show_student_info(manager: &mut RosterManager, student_id: i32) -> StoreResult<()> {
    #[derive(Tabled)]
    struct SessionLine {
        enrollment: i32,
        therapy: String,
        day: Weekday,
        time: String,
        status: String,
        since: NaiveDate,
    }

    let student = manager.student(student_id)?;
    let school = manager.school(student.school_id)?;
    let diagnosis = match student.diagnosis_id {
        Some(id) => Some(manager.diagnosis(id)?.name),
        None => None,
    };

    println!(
        "#{} {} ({})",
        student.enrollment_number,
        student.full_name,
        state(student.active)
    );
    println!("School:    {}", school.name);
    println!("Grade:     {}", student.grade);
    println!("Diagnosis: {}", dash(diagnosis.as_deref()));
    println!("Transport: {}", if student.transport { "yes" } else { "no" });

    let sessions: Vec<SessionLine> = manager
        .student_enrollments(student_id)?
        .into_iter()
        .map(|(enrollment, therapy)| SessionLine {
            enrollment: enrollment.id,
            therapy: therapy.name,
            day: enrollment.weekday,
            time: time_range(enrollment.start_time, enrollment.end_time),
            status: enrollment.status.to_string(),
            since: enrollment.created_on,
        })
        .collect();
    println!("Sessions:\n{}", render(sessions));

    let attendance = manager.student_attendance(student_id)?;
    println!(
        "Attendance: {} present, {} excused, {} absent",
        attendance.present.len(),
        attendance.excused.len(),
        attendance.absent.len()
    );

    Ok(())
}

/// Pretty prints the weekly schedule of every active student.
pub fn show_dashboard(manager: &mut RosterManager, filter: &DashboardFilter) -> StoreResult<()> {
    #[derive(Tabled)]
    struct ScheduleLine {
        day: Weekday,
        time: String,
        student: String,
        school: String,
        therapy: String,
        status: String,
    }

    let lines: Vec<ScheduleLine> = manager
        .dashboard(filter)?
        .into_iter()
        .map(|row| ScheduleLine {
            day: row.enrollment.weekday,
            time: time_range(row.enrollment.start_time, row.enrollment.end_time),
            therapy: row.therapy.short_name().to_string(),
            status: row.enrollment.status.to_string(),
            student: row.student,
            school: row.school,
        })
        .collect();

    println!("Weekly schedule:\n{}", render(lines));
    Ok(())
}

/// Pretty prints the sessions due on a date and what has been recorded for them.
pub fn show_roll_call(
    manager: &mut RosterManager,
    query: &RollCallQuery,
    today: NaiveDate,
) -> StoreResult<()> {
    #[derive(Tabled)]
    struct RollCallLine {
        enrollment: i32,
        time: String,
        student: String,
        therapy: String,
        attendance: String,
    }

    let roll_call = manager.roll_call(query, today)?;

    let Some(weekday) = roll_call.weekday else {
        println!("{} is a weekend day, nothing is scheduled.", roll_call.date);
        return Ok(());
    };

    let lines: Vec<RollCallLine> = roll_call
        .entries
        .into_iter()
        .map(|entry| RollCallLine {
            enrollment: entry.enrollment_id,
            time: time_range(entry.start, entry.end),
            therapy: entry.therapy.short_name().to_string(),
            attendance: entry
                .status
                .map_or_else(|| "-".to_string(), |status| status.to_string()),
            student: entry.student,
        })
        .collect();

    let lock = if roll_call.locked { " (locked)" } else { "" };
    println!("Roll call for {weekday} {}{lock}:\n{}", roll_call.date, render(lines));
    Ok(())
}
