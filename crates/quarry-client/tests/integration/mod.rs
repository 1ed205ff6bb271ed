mod search_tests;
