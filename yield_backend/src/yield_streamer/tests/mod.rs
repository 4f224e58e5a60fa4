mod accrual;
