#[cfg(test)]
mod tests {
    use atlas::expr::{
        extract_dependencies, format_expression, is_guid, is_valid_table_name,
        looks_like_valid_expression,
    };

    #[test]
    fn test_extraction_separates_columns_and_measures() {
        let deps = extract_dependencies(
            "DIVIDE([Total Sales] - [Total Cost], SUM('Sales'[Amount]))",
        );
        assert!(deps.measures.contains("Total Sales"));
        assert!(deps.measures.contains("Total Cost"));
        assert!(!deps.measures.contains("Amount"));
        assert!(deps.columns.contains("Sales.Amount"));
    }

    #[test]
    fn test_extraction_handles_repeated_references() {
        let deps = extract_dependencies("[Profit] + [Profit] + 'Dim Date'[Year]");
        assert_eq!(deps.measures.len(), 1);
        assert_eq!(deps.columns.len(), 1);
        assert!(deps.columns.contains("Dim Date.Year"));
    }

    #[test]
    fn test_extraction_of_empty_expression() {
        let deps = extract_dependencies("");
        assert!(deps.measures.is_empty());
        assert!(deps.columns.is_empty());
    }

    #[test]
    fn test_plausibility_check() {
        assert!(looks_like_valid_expression("CALCULATE(SUM('Sales'[Amount]))"));
        assert!(looks_like_valid_expression("DIVIDE([A], [B])"));
        assert!(!looks_like_valid_expression("hello world"));
        assert!(!looks_like_valid_expression(""));
    }

    #[test]
    fn test_formatting_breaks_before_keywords() {
        let formatted = format_expression("CALCULATE(SUM('Sales'[Amount]), FILTER(ALL('Date'), TRUE))");
        assert!(formatted.contains("\nFILTER"));
        assert!(formatted.contains("\nALL"));
    }

    #[test]
    fn test_table_name_validation() {
        assert!(is_valid_table_name("FactSales"));
        assert!(is_valid_table_name("Dim Date"));
        assert!(!is_valid_table_name("Bad/Name"));
        assert!(!is_valid_table_name("Bad*Name"));
        assert!(!is_valid_table_name(""));
    }

    #[test]
    fn test_guid_validation() {
        assert!(is_guid("11111111-2222-3333-4444-555555555555"));
        assert!(is_guid("A1B2C3D4-E5F6-7890-ABCD-EF0123456789"));
        assert!(!is_guid("not-a-guid"));
        assert!(!is_guid("111111112222333344445555555555555"));
    }
}
